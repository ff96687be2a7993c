//! Connection Handler Module
//!
//! This module serves a single client connection. Every connection runs as
//! its own task on the server instance's event-loop thread and repeats one
//! strict cycle until the peer goes away.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Accepted by the event loop
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │  Active (awaiting a frame)   │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read 128 bytes          │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Dispatch by opcode      │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Write 128 bytes         │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 3. Closed (EOF, read error, write error)
//! ```
//!
//! ## Short Reads
//!
//! TCP is a stream protocol, so a frame may arrive in several segments.
//! Incoming bytes are accumulated in a `BytesMut` until a full frame is
//! buffered. Any bytes past the first frame stay in the buffer for the next
//! cycle, which keeps responses in request order.
//!
//! ## Error Classification
//!
//! | Condition                              | Outcome                     |
//! |----------------------------------------|-----------------------------|
//! | EOF between frames                     | connection closed           |
//! | EOF inside a frame, read error         | connection closed           |
//! | write error: broken pipe / reset       | connection closed           |
//! | any other write error                  | fatal: server loop stops    |

use crate::commands::Dispatcher;
use crate::connection::stats::ServerStats;
use crate::protocol::{FrameError, RequestFrame, ResponseFrame, FRAME_LEN};
use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, trace};

/// How a connection ended.
#[derive(Debug)]
pub enum ConnectionOutcome {
    /// Only this connection is affected
    Closed,
    /// The server must stop serving
    Fatal(ConnectionError),
}

/// Errors that can occur while serving a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Reading the request failed
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// Writing the response failed
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// A buffered frame could not be decoded
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Client closed the connection between frames
    #[error("client disconnected")]
    ClientDisconnected,

    /// Client closed the connection in the middle of a frame
    #[error("unexpected end of stream with {buffered} bytes of a frame buffered")]
    UnexpectedEof { buffered: usize },
}

impl ConnectionError {
    /// Returns true if this error must take the whole server down.
    ///
    /// Only send failures that do not mean "the peer went away" qualify.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConnectionError::Write(e) if !is_peer_gone(e))
    }
}

/// Returns true if `err` means the peer reset or abandoned the connection.
fn is_peer_gone(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

/// Serves one client connection.
///
/// Generic over the stream so the cycle can be driven by any
/// `AsyncRead + AsyncWrite` transport.
pub struct ConnectionHandler<S> {
    /// The client stream
    stream: S,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes received but not yet consumed as a frame
    buffer: BytesMut,

    /// Routes requests to handlers
    dispatcher: Dispatcher,

    /// Server statistics (shared)
    stats: Arc<ServerStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler and counts the connection as open.
    pub fn new(
        stream: S,
        addr: SocketAddr,
        dispatcher: Dispatcher,
        stats: Arc<ServerStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream,
            addr,
            buffer: BytesMut::with_capacity(FRAME_LEN),
            dispatcher,
            stats,
        }
    }

    /// Runs request/response cycles until the connection ends.
    pub async fn run(mut self) -> ConnectionOutcome {
        debug!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        let err = match result {
            Ok(()) => return ConnectionOutcome::Closed,
            Err(e) => e,
        };

        if err.is_fatal() {
            error!(client = %self.addr, error = %err, "Unrecoverable send failure");
            return ConnectionOutcome::Fatal(err);
        }

        match err {
            ConnectionError::ClientDisconnected => {
                debug!(client = %self.addr, "Client disconnected");
            }
            e => debug!(client = %self.addr, error = %e, "Closing connection"),
        }

        ConnectionOutcome::Closed
    }

    /// The read-dispatch-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let request = self.read_frame().await?;
            let response = self.dispatcher.dispatch(&request);

            if let Ok(status) = response.status() {
                self.stats.request_served(status);
                trace!(
                    client = %self.addr,
                    opcode = request.opcode(),
                    status = status.code(),
                    "Dispatched request"
                );
            }

            self.write_frame(&response).await?;
        }
    }

    /// Reads until one full request frame is buffered, then consumes it.
    async fn read_frame(&mut self) -> Result<RequestFrame, ConnectionError> {
        while self.buffer.len() < FRAME_LEN {
            self.buffer.reserve(FRAME_LEN - self.buffer.len());

            let n = self
                .stream
                .read_buf(&mut self.buffer)
                .await
                .map_err(ConnectionError::Read)?;

            if n == 0 {
                return Err(if self.buffer.is_empty() {
                    ConnectionError::ClientDisconnected
                } else {
                    ConnectionError::UnexpectedEof {
                        buffered: self.buffer.len(),
                    }
                });
            }

            self.stats.bytes_read(n);
            trace!(client = %self.addr, bytes = n, "Read data");
        }

        let frame = self.buffer.split_to(FRAME_LEN);
        Ok(RequestFrame::decode(&frame)?)
    }

    /// Writes one full response frame.
    async fn write_frame(&mut self, response: &ResponseFrame) -> Result<(), ConnectionError> {
        let bytes = response.to_bytes();
        self.stream
            .write_all(&bytes)
            .await
            .map_err(ConnectionError::Write)?;
        self.stream.flush().await.map_err(ConnectionError::Write)?;
        self.stats.bytes_written(bytes.len());
        Ok(())
    }
}

impl<S> Drop for ConnectionHandler<S> {
    fn drop(&mut self) {
        // Also runs when the event loop aborts the task.
        self.stats.connection_closed();
    }
}
