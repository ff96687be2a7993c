//! Command Module
//!
//! This module implements the command layer: the handler capability supplied
//! by the embedding application, the immutable table that maps opcodes to
//! handlers, and the dispatcher that routes each request.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RequestFrame   │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   Dispatcher    │  (this module)
//! │                 │
//! │  - Lookup       │──> CommandTable
//! │  - Invoke       │──> CommandHandler
//! │  - Set status   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  ResponseFrame  │
//! └─────────────────┘
//! ```

pub mod dispatcher;
pub mod handler;
pub mod table;

pub use dispatcher::Dispatcher;
pub use handler::{CommandHandler, HandlerError, HandlerResult};
pub use table::{CommandEntry, CommandTable, CommandTableBuilder, MAX_COMMANDS};
