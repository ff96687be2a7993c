//! Server Statistics
//!
//! Lock-free counters shared between the event loop, every connection of a
//! server instance, and the [`ServerHandle`](crate::server::ServerHandle)
//! held by the embedding application.

use crate::protocol::Status;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for one server instance.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently open client connections
    pub active_connections: AtomicU64,
    /// Accept attempts that failed
    pub accept_errors: AtomicU64,
    /// Total requests dispatched
    pub requests_served: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
    /// Responses sent, indexed like `Status::ALL`
    responses: [AtomicU64; 4],
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn accept_failed(&self) {
        self.accept_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_served(&self, status: Status) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        self.responses[status_slot(status)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Number of responses sent with `status`.
    pub fn responses(&self, status: Status) -> u64 {
        self.responses[status_slot(status)].load(Ordering::Relaxed)
    }

    /// Number of currently open client connections.
    pub fn active(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }
}

fn status_slot(status: Status) -> usize {
    match status {
        Status::UnknownCommand => 0,
        Status::NotImplemented => 1,
        Status::HandlerError => 2,
        Status::Ok => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_counters() {
        let stats = ServerStats::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 2);
        assert_eq!(stats.active(), 1);
    }

    #[test]
    fn test_responses_by_status() {
        let stats = ServerStats::new();
        stats.request_served(Status::Ok);
        stats.request_served(Status::Ok);
        stats.request_served(Status::NotImplemented);

        assert_eq!(stats.requests_served.load(Ordering::Relaxed), 3);
        assert_eq!(stats.responses(Status::Ok), 2);
        assert_eq!(stats.responses(Status::NotImplemented), 1);
        assert_eq!(stats.responses(Status::UnknownCommand), 0);
        assert_eq!(stats.responses(Status::HandlerError), 0);
    }

    #[test]
    fn test_slots_follow_status_order() {
        for (i, status) in Status::ALL.into_iter().enumerate() {
            assert_eq!(status_slot(status), i);
        }
    }
}
