//! Server Module
//!
//! This module runs command servers. Each server instance gets its own OS
//! thread with a single-threaded async runtime: a listener plus an event
//! loop that multiplexes every client connection of that instance.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ServerHandle (caller's thread)                              │
//! │    ready() / stop() / join() / stats()                       │
//! └───────────────┬──────────────────────────────────────────────┘
//!                 │ spawn "msgsrv-<port>"
//!                 ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Server thread (current-thread runtime)                      │
//! │                                                              │
//! │  ┌──────────────┐     ┌──────────────────────────────────┐   │
//! │  │  Listener    │────>│  Event loop                      │   │
//! │  │  bootstrap   │     │   ├─ accept ──> ConnectionSet    │   │
//! │  └──────────────┘     │   ├─ connection ended            │   │
//! │                       │   └─ shutdown signal             │   │
//! │                       └──────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any number of instances can run side by side on different ports.
//!
//! ## Example
//!
//! ```ignore
//! use msgsrv::commands::CommandTable;
//! use msgsrv::server::{start, ServerDescriptor};
//!
//! let table = CommandTable::builder()
//!     .register_fn(0x10, |request, response| {
//!         response[1] = request[1];
//!         Ok(())
//!     })
//!     .build();
//!
//! let mut server = start(ServerDescriptor::new(5000, table))?;
//! let addr = server.ready().await?;
//! println!("listening on {}", addr);
//! server.detach();
//! ```

pub mod config;
pub mod error;
mod event_loop;
pub mod handle;
pub mod listener;

pub use config::{ServerConfig, ServerDescriptor};
pub use error::ServerError;
pub use handle::ServerHandle;
pub use listener::bind_listener;

/// Starts a server instance on its own thread and returns immediately.
///
/// Shorthand for [`ServerHandle::start`].
pub fn start(descriptor: ServerDescriptor) -> Result<ServerHandle, ServerError> {
    ServerHandle::start(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MessageClient;
    use crate::commands::{CommandTable, HandlerError};
    use crate::protocol::{RequestFrame, ResponseFrame, Status, FRAME_LEN};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn create_table() -> CommandTable {
        CommandTable::builder()
            .register_fn(0x10, |request, response| {
                response[1] = request[1];
                Ok(())
            })
            .register_fn(0x20, |request, response| {
                let sum = request[1]
                    .checked_add(request[2])
                    .ok_or_else(|| HandlerError::new("overflow"))?;
                response[1] = sum;
                Ok(())
            })
            .unimplemented(0x30)
            .build()
    }

    async fn start_server(table: CommandTable) -> (ServerHandle, SocketAddr) {
        let config = ServerConfig::new(0).with_host(Ipv4Addr::LOCALHOST);
        let mut handle = start(ServerDescriptor::with_config(config, table)).unwrap();
        let addr = handle.ready().await.unwrap();
        (handle, addr)
    }

    async fn stop_server(handle: ServerHandle) -> Result<(), ServerError> {
        handle.stop();
        tokio::task::spawn_blocking(move || handle.join())
            .await
            .unwrap()
    }

    /// Polls `condition` for up to two seconds.
    async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_echo_and_unknown_scenario() {
        let (handle, addr) = start_server(create_table()).await;
        let mut client = MessageClient::connect(addr).await.unwrap();

        let response = client.call_words(0x10, &[7]).await.unwrap();
        assert_eq!(response, ResponseFrame::with_payload(Status::Ok, &[7]).unwrap());

        let response = client.call_words(0x99, &[1, 2, 3]).await.unwrap();
        assert_eq!(response, ResponseFrame::new(Status::UnknownCommand));

        stop_server(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_every_status_over_the_wire() {
        let (handle, addr) = start_server(create_table()).await;
        let mut client = MessageClient::connect(addr).await.unwrap();

        let response = client.call_words(0x20, &[40, 2]).await.unwrap();
        assert_eq!(response.status().unwrap(), Status::Ok);
        assert_eq!(response[1], 42);

        let response = client.call_words(0x20, &[u32::MAX, 1]).await.unwrap();
        assert_eq!(response.status().unwrap(), Status::HandlerError);

        let response = client.call_words(0x30, &[]).await.unwrap();
        assert_eq!(response.status().unwrap(), Status::NotImplemented);

        let stats = handle.stats();
        assert_eq!(stats.requests_served.load(Ordering::Relaxed), 3);
        assert_eq!(stats.responses(Status::HandlerError), 1);

        stop_server(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_sequential_cycles_in_order() {
        let (handle, addr) = start_server(create_table()).await;
        let mut client = MessageClient::connect(addr).await.unwrap();

        for i in 0..50u32 {
            let response = client.call_words(0x10, &[i * 3]).await.unwrap();
            assert_eq!(response.status().unwrap(), Status::Ok);
            assert_eq!(response[1], i * 3);
        }

        stop_server(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_clients() {
        let (handle, addr) = start_server(create_table()).await;

        let mut tasks = Vec::new();
        for client_id in 0..8u32 {
            tasks.push(tokio::spawn(async move {
                let mut client = MessageClient::connect(addr).await.unwrap();
                for i in 0..20u32 {
                    let value = client_id * 1000 + i;
                    let response = client.call_words(0x10, &[value]).await.unwrap();
                    assert_eq!(response[1], value);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stats = handle.stats();
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 8);
        assert_eq!(stats.responses(Status::Ok), 160);

        stop_server(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_eof_removes_connection() {
        let (handle, addr) = start_server(create_table()).await;

        let mut keeper = MessageClient::connect(addr).await.unwrap();
        let mut leaver = MessageClient::connect(addr).await.unwrap();
        leaver.call_words(0x10, &[1]).await.unwrap();
        keeper.call_words(0x10, &[1]).await.unwrap();

        let stats = std::sync::Arc::clone(handle.stats());
        assert_eq!(stats.active(), 2);

        drop(leaver);
        assert!(eventually(|| stats.active() == 1).await);

        // The remaining connection is unaffected.
        let response = keeper.call_words(0x10, &[9]).await.unwrap();
        assert_eq!(response[1], 9);

        stop_server(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_split_request_is_reassembled() {
        let (handle, addr) = start_server(create_table()).await;
        let mut stream = MessageClient::connect(addr).await.unwrap().into_inner();

        let bytes = RequestFrame::with_payload(0x10, &[77]).unwrap().to_bytes();
        stream.write_all(&bytes[..10]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        stream.write_all(&bytes[10..90]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        stream.write_all(&bytes[90..]).await.unwrap();

        let mut buf = [0u8; FRAME_LEN];
        stream.read_exact(&mut buf).await.unwrap();
        let response = ResponseFrame::decode(&buf).unwrap();
        assert_eq!(response.words()[..2], [200, 77]);

        stop_server(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_truncated_frame_closes_only_that_connection() {
        let (handle, addr) = start_server(create_table()).await;
        let mut stream = MessageClient::connect(addr).await.unwrap().into_inner();

        let bytes = RequestFrame::new(0x10).to_bytes();
        stream.write_all(&bytes[..50]).await.unwrap();
        stream.shutdown().await.unwrap();

        // The server answers nothing and closes its side.
        let mut buf = Vec::new();
        let n = stream.read_to_end(&mut buf).await.unwrap_or(0);
        assert_eq!(n, 0);

        let stats = std::sync::Arc::clone(handle.stats());
        assert!(eventually(|| stats.active() == 0).await);
        assert_eq!(stats.requests_served.load(Ordering::Relaxed), 0);

        let mut client = MessageClient::connect(addr).await.unwrap();
        let response = client.call_words(0x10, &[5]).await.unwrap();
        assert_eq!(response[1], 5);

        stop_server(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_closes_listener_and_connections() {
        let (handle, addr) = start_server(create_table()).await;
        let mut client = MessageClient::connect(addr).await.unwrap();
        client.call_words(0x10, &[1]).await.unwrap();

        stop_server(handle).await.unwrap();

        assert!(client.call_words(0x10, &[1]).await.is_err());
        assert!(MessageClient::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_port_in_use_stops_before_serving() {
        let (first, addr) = start_server(create_table()).await;

        let config = ServerConfig::new(addr.port()).with_host(Ipv4Addr::LOCALHOST);
        let mut second = start(ServerDescriptor::with_config(config, create_table())).unwrap();

        assert!(matches!(second.ready().await, Err(ServerError::NotListening)));
        let result = tokio::task::spawn_blocking(move || second.join())
            .await
            .unwrap();
        assert!(matches!(result, Err(ServerError::Bind { .. })));

        // The first instance is unaffected.
        let mut client = MessageClient::connect(addr).await.unwrap();
        assert_eq!(client.call_words(0x10, &[3]).await.unwrap()[1], 3);

        stop_server(first).await.unwrap();
    }

    #[tokio::test]
    async fn test_independent_instances() {
        let other_table = CommandTable::builder()
            .register_fn(0x10, |_, response| {
                response[1] = 1234;
                Ok(())
            })
            .build();

        let (first, first_addr) = start_server(create_table()).await;
        let (second, second_addr) = start_server(other_table).await;
        assert_ne!(first_addr, second_addr);

        let mut a = MessageClient::connect(first_addr).await.unwrap();
        let mut b = MessageClient::connect(second_addr).await.unwrap();
        assert_eq!(a.call_words(0x10, &[8]).await.unwrap()[1], 8);
        assert_eq!(b.call_words(0x10, &[8]).await.unwrap()[1], 1234);
        assert_eq!(
            b.call_words(0x30, &[]).await.unwrap().status().unwrap(),
            Status::UnknownCommand
        );

        stop_server(first).await.unwrap();
        stop_server(second).await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_stops_and_detach_keeps_running() {
        let (dropped, dropped_addr) = start_server(create_table()).await;
        let stats = std::sync::Arc::clone(dropped.stats());
        drop(dropped);
        assert!(
            eventually(|| std::net::TcpStream::connect(dropped_addr).is_err()).await,
            "dropped server should stop listening"
        );
        assert_eq!(stats.active(), 0);

        let (detached, detached_addr) = start_server(create_table()).await;
        detached.detach();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut client = MessageClient::connect(detached_addr).await.unwrap();
        assert_eq!(client.call_words(0x10, &[6]).await.unwrap()[1], 6);
    }

    #[tokio::test]
    async fn test_is_finished() {
        let (handle, _) = start_server(create_table()).await;
        assert!(!handle.is_finished());

        handle.stop();
        let handle = tokio::task::spawn_blocking(move || {
            while !handle.is_finished() {
                std::thread::sleep(Duration::from_millis(5));
            }
            handle
        })
        .await
        .unwrap();
        handle.join().unwrap();
    }
}
