//! # msgsrv - A Fixed-Frame Binary Command Server
//!
//! msgsrv lets a process expose a small set of binary commands over TCP.
//! Other processes connect, send fixed-size request frames, and receive
//! fixed-size response frames carrying a status code.
//!
//! ## Features
//!
//! - **Fixed Frames**: 32 big-endian `u32` words per request and response
//! - **Opcode Dispatch**: An immutable table routes each request to a handler
//! - **One Thread per Server**: Each instance multiplexes all its clients on
//!   a single event-loop thread, so handlers never run concurrently
//! - **Explicit Lifecycle**: Start, wait until listening, stop, join
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Server thread (per port)                        │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │  Listener   │───>│ Event Loop  │───>│ Connection  │                  │
//! │  │ (bootstrap) │    │ (select!)   │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   Frame     │    │              Dispatcher                      │   │
//! │  │   Codec     │    │   opcode ──> CommandTable ──> CommandHandler │   │
//! │  └─────────────┘    └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use msgsrv::commands::CommandTable;
//! use msgsrv::server::{start, ServerDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let table = CommandTable::builder()
//!         .register_fn(0x10, |request, response| {
//!             response[1] = request[1];
//!             Ok(())
//!         })
//!         .unimplemented(0x20)
//!         .build();
//!
//!     let mut server = start(ServerDescriptor::new(5000, table))?;
//!     server.ready().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Frame layout, status codes and the wire codec
//! - [`commands`]: Handler trait, command table and dispatcher
//! - [`connection`]: Per-connection request/response cycle and statistics
//! - [`server`]: Listener bootstrap, event loop and lifecycle handle
//! - [`client`]: A small async client
//!
//! ## Design Highlights
//!
//! ### Single-Threaded Instances
//!
//! Each server runs on its own OS thread with a current-thread Tokio
//! runtime. Connection tasks share that thread, so the command table is read
//! without locks and handler calls are serialized. A handler that blocks
//! stalls its whole instance.
//!
//! ### Status Codes
//!
//! Command outcomes travel in-band: `200` OK, `100` unknown command, `110`
//! not implemented, `120` handler error. Server-side failures are logged and
//! reported only through the [`ServerHandle`].

pub mod client;
pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;

use std::net::{IpAddr, Ipv4Addr};

// Re-export commonly used types for convenience
pub use client::{ClientError, MessageClient};
pub use commands::{CommandHandler, CommandTable, Dispatcher, HandlerError, HandlerResult};
pub use connection::ServerStats;
pub use protocol::{FrameError, RequestFrame, ResponseFrame, Status};
pub use server::{start, ServerConfig, ServerDescriptor, ServerError, ServerHandle};

/// The default port msgsrv listens on
pub const DEFAULT_PORT: u16 = 5000;

/// The default host msgsrv binds to (all interfaces)
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Maximum number of pending connections on the listening socket
pub const DEFAULT_BACKLOG: u32 = 5;

/// Version of msgsrv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
