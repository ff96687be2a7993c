//! msgsrv - Fixed-Frame Command Server
//!
//! This is a demo server binary. It registers a few sample commands, starts
//! one server instance, and runs until Ctrl+C.

use msgsrv::commands::{CommandTable, HandlerError};
use msgsrv::server::{start, ServerConfig, ServerDescriptor};
use std::net::IpAddr;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Demo opcodes
mod opcode {
    pub const PING: u32 = 0x01;
    pub const ECHO: u32 = 0x10;
    pub const ADD: u32 = 0x20;
    pub const RESERVED: u32 = 0x30;
}

/// Server configuration
struct Config {
    /// Host to bind to
    host: IpAddr,
    /// Port to listen on
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: msgsrv::DEFAULT_HOST,
            port: msgsrv::DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid host address");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("msgsrv version {}", msgsrv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.port).with_host(self.host)
    }
}

fn print_help() {
    println!(
        r#"
msgsrv - Fixed-Frame Command Server

USAGE:
    msgsrv [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Address to bind to (default: 0.0.0.0)
    -p, --port <PORT>    Port to listen on (default: 5000)
    -v, --version        Print version information
        --help           Print this help message

PROTOCOL:
    Requests and responses are 32 big-endian u32 words (128 bytes).
    Word 0 of a request is the opcode, word 0 of a response the status:
    200 OK, 100 unknown command, 110 not implemented, 120 handler error.

DEMO COMMANDS:
    0x01  PING      Always succeeds
    0x10  ECHO      Returns the request payload unchanged
    0x20  ADD       word1 = word1 + word2, fails on overflow
    0x30  RESERVED  Registered without a handler
"#
    );
}

/// Builds the demo command table.
fn demo_commands() -> CommandTable {
    CommandTable::builder()
        .register_fn(opcode::PING, |_, _| Ok(()))
        .register_fn(opcode::ECHO, |request, response| {
            response.payload_mut().copy_from_slice(request.payload());
            Ok(())
        })
        .register_fn(opcode::ADD, |request, response| {
            response[1] = request[1]
                .checked_add(request[2])
                .ok_or_else(|| HandlerError::new("addition overflowed"))?;
            Ok(())
        })
        .unimplemented(opcode::RESERVED)
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .init();

    let table = demo_commands();
    info!(commands = table.len(), "Command table built");

    let mut server = start(ServerDescriptor::with_config(config.server_config(), table))?;
    let addr = server.ready().await?;
    info!("msgsrv v{} ready on {}", msgsrv::VERSION, addr);

    signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping server...");

    server.stop();
    tokio::task::spawn_blocking(move || server.join()).await??;

    info!("Server shutdown complete");
    Ok(())
}
