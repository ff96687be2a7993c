//! Server Lifecycle
//!
//! [`ServerHandle::start`] spawns a dedicated OS thread for one server
//! instance and returns immediately. The thread owns a current-thread Tokio
//! runtime, binds the listener, and runs the event loop on it.
//!
//! The handle is the only way to observe or control the instance:
//!
//! - [`ready`](ServerHandle::ready) waits until the listener is bound
//! - [`stop`](ServerHandle::stop) asks the loop to close everything and exit
//! - [`join`](ServerHandle::join) blocks until the thread has exited
//! - [`detach`](ServerHandle::detach) lets the server run for the life of
//!   the process
//!
//! Dropping a handle that was not detached stops the server.

use crate::commands::Dispatcher;
use crate::connection::ServerStats;
use crate::server::config::{ServerConfig, ServerDescriptor};
use crate::server::error::ServerError;
use crate::server::{event_loop, listener};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

/// Controls one running server instance.
#[derive(Debug)]
pub struct ServerHandle {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
    /// Fires once the listener is bound
    ready_rx: Option<oneshot::Receiver<SocketAddr>>,
    /// Bound address, once known
    local_addr: Option<SocketAddr>,
    /// The server thread
    thread: Option<JoinHandle<Result<(), ServerError>>>,
    /// Statistics (shared with the event loop)
    stats: Arc<ServerStats>,
    detached: bool,
}

impl ServerHandle {
    /// Starts a server instance on its own thread.
    ///
    /// Returns as soon as the thread is spawned; binding happens on the server
    /// thread. Bootstrap failures are logged there and reported by
    /// [`ready`](Self::ready) and [`join`](Self::join).
    pub fn start(descriptor: ServerDescriptor) -> Result<Self, ServerError> {
        let ServerDescriptor { config, table } = descriptor;
        let dispatcher = Dispatcher::new(Arc::new(table));
        let stats = Arc::new(ServerStats::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();

        let port = config.port;
        let thread_stats = Arc::clone(&stats);
        let thread = thread::Builder::new()
            .name(format!("msgsrv-{}", port))
            .spawn(move || {
                let result = serve(config, dispatcher, thread_stats, shutdown_rx, ready_tx);
                match &result {
                    Ok(()) => info!(port, "Server stopped"),
                    Err(e) => error!(port, error = %e, "Server thread exiting"),
                }
                result
            })
            .map_err(ServerError::Spawn)?;

        Ok(Self {
            shutdown_tx,
            ready_rx: Some(ready_rx),
            local_addr: None,
            thread: Some(thread),
            stats,
            detached: false,
        })
    }

    /// Waits until the server is listening and returns its bound address.
    ///
    /// Returns [`ServerError::NotListening`] if the server thread exited
    /// before binding; [`join`](Self::join) returns the cause.
    pub async fn ready(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(addr) = self.local_addr {
            return Ok(addr);
        }

        let rx = self.ready_rx.take().ok_or(ServerError::NotListening)?;
        let addr = rx.await.map_err(|_| ServerError::NotListening)?;
        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Returns the bound address if [`ready`](Self::ready) has observed it.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Returns the statistics of this instance.
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Returns true once the server thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Asks the server to stop. Does not wait; see [`join`](Self::join).
    pub fn stop(&self) {
        // Fails only if the loop is already gone.
        let _ = self.shutdown_tx.send(true);
    }

    /// Blocks until the server thread exits and returns the loop's outcome.
    ///
    /// This does not stop the server by itself; call [`stop`](Self::stop)
    /// first. From async code, run it on a blocking thread.
    pub fn join(mut self) -> Result<(), ServerError> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| ServerError::Panicked)?,
            None => Ok(()),
        }
    }

    /// Lets the server run until the process exits.
    pub fn detach(mut self) {
        self.detached = true;
        self.thread.take();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if !self.detached {
            self.stop();
        }
    }
}

/// Body of the server thread.
fn serve(
    config: ServerConfig,
    dispatcher: Dispatcher,
    stats: Arc<ServerStats>,
    shutdown_rx: watch::Receiver<bool>,
    ready_tx: oneshot::Sender<SocketAddr>,
) -> Result<(), ServerError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;

    runtime.block_on(async move {
        let listener = listener::bind_listener(&config)?;
        let addr = listener.local_addr().map_err(ServerError::Listen)?;
        info!(%addr, commands = dispatcher.table().len(), "Listening for requests");

        // The handle may already be gone.
        let _ = ready_tx.send(addr);

        event_loop::run(listener, dispatcher, stats, shutdown_rx).await
    })
}
