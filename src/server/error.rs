//! Server Errors

use crate::connection::ConnectionError;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that stop a server instance.
///
/// None of these reach the application through the request path; they are
/// logged on the server thread and surfaced through
/// [`ServerHandle`](crate::server::ServerHandle).
#[derive(Debug, Error)]
pub enum ServerError {
    /// The per-instance async runtime could not be created
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] io::Error),

    /// The server thread could not be spawned
    #[error("failed to spawn server thread: {0}")]
    Spawn(#[source] io::Error),

    /// The listening socket could not be created
    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    /// The socket could not be put into listening state
    #[error("failed to listen: {0}")]
    Listen(#[source] io::Error),

    /// A response could not be sent for a reason other than the peer leaving
    #[error("unrecoverable send failure: {0}")]
    Send(#[source] ConnectionError),

    /// A connection task ended abnormally (for example a panicking handler)
    #[error("connection task failed: {0}")]
    ConnectionTask(#[source] tokio::task::JoinError),

    /// The server stopped before it started listening
    #[error("server is not listening")]
    NotListening,

    /// The server thread panicked
    #[error("server thread panicked")]
    Panicked,
}
