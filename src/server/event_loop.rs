//! Event Loop
//!
//! The multiplexer of one server instance. A single `tokio::select!` waits
//! on three sources at once:
//!
//! ```text
//!               ┌──────────────────────────────┐
//!  stop() ─────>│                              │
//!               │                              │──> accept: join ConnectionSet
//!  listener ───>│   select! (one thread)       │
//!               │                              │──> connection ended: drop it,
//!  connection ─>│                              │    or stop everything if fatal
//!  tasks        └──────────────────────────────┘
//! ```
//!
//! All connection tasks live on the same current-thread runtime as the loop,
//! so handlers, reads and writes of one instance never run concurrently and
//! the command table needs no locking.

use crate::commands::Dispatcher;
use crate::connection::{ConnectionHandler, ConnectionOutcome, ServerStats};
use crate::server::error::ServerError;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// A source of incoming client connections.
pub(crate) trait Acceptor {
    /// The connection stream type
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Waits for the next connection.
    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// The open client connections of one server instance.
///
/// Dropping the set aborts every connection task, which closes its socket.
#[derive(Debug, Default)]
pub(crate) struct ConnectionSet {
    tasks: JoinSet<ConnectionOutcome>,
}

impl ConnectionSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts serving a newly accepted connection.
    pub(crate) fn insert<S>(&mut self, handler: ConnectionHandler<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.tasks.spawn(handler.run());
    }

    /// Waits for the next connection to end. Returns `None` if the set is empty.
    pub(crate) async fn next_closed(&mut self) -> Option<Result<ConnectionOutcome, JoinError>> {
        self.tasks.join_next().await
    }

    /// Closes every connection.
    pub(crate) async fn close_all(&mut self) {
        self.tasks.shutdown().await;
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

/// Runs the event loop until `stop` is signalled or a fatal error occurs.
///
/// On return the listener and all connections have been closed.
pub(crate) async fn run<A: Acceptor>(
    mut listener: A,
    dispatcher: Dispatcher,
    stats: Arc<ServerStats>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let mut connections = ConnectionSet::new();
    // Cleared when the handle is detached: nobody can ask us to stop anymore.
    let mut watching = true;
    // Repeats of the same accept failure are logged at debug level.
    let mut last_accept_error: Option<io::ErrorKind> = None;

    loop {
        tokio::select! {
            result = shutdown_rx.changed(), if watching => {
                if result.is_err() {
                    watching = false;
                } else if *shutdown_rx.borrow() {
                    info!(open = connections.len(), "Shutdown requested, closing connections");
                    connections.close_all().await;
                    return Ok(());
                }
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    last_accept_error = None;
                    let handler = ConnectionHandler::new(
                        stream,
                        addr,
                        dispatcher.clone(),
                        Arc::clone(&stats),
                    );
                    connections.insert(handler);
                }
                Err(e) => {
                    stats.accept_failed();
                    if last_accept_error == Some(e.kind()) {
                        debug!(error = %e, "Failed to accept connection");
                    } else {
                        warn!(error = %e, "Failed to accept connection");
                        last_accept_error = Some(e.kind());
                    }
                }
            },

            Some(finished) = connections.next_closed() => match finished {
                Ok(ConnectionOutcome::Closed) => {}
                Ok(ConnectionOutcome::Fatal(e)) => {
                    error!(open = connections.len(), "Closing all connections and the listener");
                    connections.close_all().await;
                    return Err(ServerError::Send(e));
                }
                Err(e) => {
                    error!(error = %e, "Connection task ended abnormally");
                    connections.close_all().await;
                    return Err(ServerError::ConnectionTask(e));
                }
            },
        }
    }
}
