//! Server Configuration
//!
//! A [`ServerDescriptor`] is everything needed to start one server instance:
//! where to listen and which commands to serve.

use crate::commands::CommandTable;
use crate::{DEFAULT_BACKLOG, DEFAULT_HOST, DEFAULT_PORT};
use std::net::{IpAddr, SocketAddr};

/// Listening configuration for one server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to (default: all interfaces)
    pub host: IpAddr,
    /// Port to listen on; 0 lets the OS pick one
    pub port: u16,
    /// Maximum number of pending connections
    pub backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
        }
    }
}

impl ServerConfig {
    /// Listens on `port` on all interfaces.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Sets the bind address.
    pub fn with_host(mut self, host: impl Into<IpAddr>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the listen backlog.
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Returns the socket address to bind.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// A server instance: where to listen plus the commands it serves.
///
/// The table is moved into the server when it starts and is never modified
/// afterwards.
#[derive(Debug)]
pub struct ServerDescriptor {
    pub config: ServerConfig,
    pub table: CommandTable,
}

impl ServerDescriptor {
    /// Serves `table` on `port` on all interfaces.
    pub fn new(port: u16, table: CommandTable) -> Self {
        Self::with_config(ServerConfig::new(port), table)
    }

    /// Serves `table` with an explicit configuration.
    pub fn with_config(config: ServerConfig, table: CommandTable) -> Self {
        Self { config, table }
    }
}
