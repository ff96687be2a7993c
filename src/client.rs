//! Request Client
//!
//! A minimal async client for the fixed-frame protocol. It keeps one TCP
//! connection open and performs strictly sequential request/response
//! cycles, the only pattern the server supports.
//!
//! ## Example
//!
//! ```ignore
//! use msgsrv::client::MessageClient;
//! use msgsrv::protocol::Status;
//!
//! let mut client = MessageClient::connect("127.0.0.1:5000").await?;
//! let response = client.call_words(0x10, &[7]).await?;
//! assert_eq!(response.status()?, Status::Ok);
//! assert_eq!(response[1], 7);
//! ```

use crate::protocol::{FrameError, RequestFrame, ResponseFrame, FRAME_LEN};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

/// Errors returned by [`MessageClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection or transfer failed (including the server closing the
    /// connection before a full response arrived)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The request could not be built
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

/// A connection to a command server.
#[derive(Debug)]
pub struct MessageClient {
    stream: TcpStream,
    peer: SocketAddr,
}

impl MessageClient {
    /// Connects to a server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Sends one request and waits for its response.
    pub async fn call(&mut self, request: &RequestFrame) -> Result<ResponseFrame, ClientError> {
        self.stream.write_all(&request.to_bytes()).await?;

        let mut buf = [0u8; FRAME_LEN];
        self.stream.read_exact(&mut buf).await?;
        let response = ResponseFrame::decode(&buf)?;

        trace!(
            server = %self.peer,
            opcode = request.opcode(),
            status = response.status_code(),
            "Received response"
        );
        Ok(response)
    }

    /// Sends `opcode` with the given leading payload words.
    pub async fn call_words(
        &mut self,
        opcode: u32,
        payload: &[u32],
    ) -> Result<ResponseFrame, ClientError> {
        let request = RequestFrame::with_payload(opcode, payload)?;
        self.call(&request).await
    }

    /// Returns the server's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Returns the underlying stream, for raw access.
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}
