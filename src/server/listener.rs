//! Listener Bootstrap
//!
//! Creates the listening socket for a server instance: socket, bind, listen.
//! Each step has its own error so the log says exactly what failed. There is
//! no retry; a port that is already in use stays in use.

use crate::server::config::ServerConfig;
use crate::server::error::ServerError;
use tokio::net::{TcpListener, TcpSocket};
use tracing::debug;

/// Creates, binds and starts listening on the configured address.
///
/// Must be called from within a Tokio runtime.
pub fn bind_listener(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.bind_address();

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(ServerError::Socket)?;

    socket
        .bind(addr)
        .map_err(|source| ServerError::Bind { addr, source })?;

    let listener = socket.listen(config.backlog).map_err(ServerError::Listen)?;
    debug!(%addr, backlog = config.backlog, "Listening socket ready");

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = ServerConfig::new(0).with_host(Ipv4Addr::LOCALHOST);
        let listener = bind_listener(&config).unwrap();

        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_port_in_use() {
        let first = bind_listener(&ServerConfig::new(0).with_host(Ipv4Addr::LOCALHOST)).unwrap();
        let port = first.local_addr().unwrap().port();

        let config = ServerConfig::new(port).with_host(Ipv4Addr::LOCALHOST);
        match bind_listener(&config) {
            Err(ServerError::Bind { addr, .. }) => assert_eq!(addr.port(), port),
            other => panic!("expected bind error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_accepts_connections() {
        let listener = bind_listener(&ServerConfig::new(0).with_host(Ipv4Addr::LOCALHOST)).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(tokio::net::TcpStream::connect(addr));
        let (_stream, peer) = listener.accept().await.unwrap();
        let client = client.await.unwrap().unwrap();

        assert_eq!(client.local_addr().unwrap(), peer);
    }
}
