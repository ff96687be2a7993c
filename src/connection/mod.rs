//! Connection Module
//!
//! This module serves individual client connections. Each accepted client is
//! driven by its own task on the owning server's event-loop thread, so all
//! connections of one server instance are served from a single thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Event Loop (server)                       │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ join the connection set
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read frame  │───>│  Dispatch   │───>│ Write frame │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Frame reassembly**: Short reads are buffered until a frame is complete
//! - **Error classification**: Peer resets close one connection, other send
//!   failures stop the server
//! - **Statistics**: Tracks connection and request metrics

pub mod handler;
pub mod stats;

// Re-export commonly used types
pub use handler::{ConnectionError, ConnectionHandler, ConnectionOutcome};
pub use stats::ServerStats;
