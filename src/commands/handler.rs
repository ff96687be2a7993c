//! Command Handlers
//!
//! A handler implements the behavior of one command. It receives the full
//! request frame and a zero-filled response frame, writes whatever payload
//! words it wants into the response, and reports success or failure.
//!
//! Handlers never choose the status word themselves: the dispatcher maps
//! `Ok(())` to [`Status::Ok`](crate::protocol::Status::Ok) and `Err(_)` to
//! [`Status::HandlerError`](crate::protocol::Status::HandlerError), and
//! overwrites word 0 after the call.
//!
//! ## Implementing a Handler
//!
//! Either implement [`CommandHandler`] on a type:
//!
//! ```
//! use msgsrv::commands::{CommandHandler, HandlerResult};
//! use msgsrv::protocol::{RequestFrame, ResponseFrame};
//!
//! struct Echo;
//!
//! impl CommandHandler for Echo {
//!     fn handle(&self, request: &RequestFrame, response: &mut ResponseFrame) -> HandlerResult {
//!         response.payload_mut().copy_from_slice(request.payload());
//!         Ok(())
//!     }
//! }
//! ```
//!
//! or register a closure with
//! [`CommandTableBuilder::register_fn`](crate::commands::CommandTableBuilder::register_fn).

use crate::protocol::{RequestFrame, ResponseFrame};
use std::fmt;
use thiserror::Error;

/// Failure reported by a handler.
///
/// The message is only logged on the server; the client sees
/// `HANDLER_ERROR` plus whatever payload the handler wrote.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with a message for the server log.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type returned by handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// The behavior of a single command.
///
/// Handlers are shared by every connection of a server instance and are
/// invoked on the server's event-loop thread, so they must be `Send + Sync`
/// and should return promptly: a blocking handler stalls the whole instance.
pub trait CommandHandler: Send + Sync {
    /// Handles one request, writing payload words into `response`.
    fn handle(&self, request: &RequestFrame, response: &mut ResponseFrame) -> HandlerResult;
}

/// Adapts a closure to [`CommandHandler`].
pub(crate) struct FnHandler<F>(pub(crate) F);

impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&RequestFrame, &mut ResponseFrame) -> HandlerResult + Send + Sync,
{
    fn handle(&self, request: &RequestFrame, response: &mut ResponseFrame) -> HandlerResult {
        (self.0)(request, response)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}
