//! Request Dispatcher
//!
//! Routes a decoded request to the handler registered for its opcode and
//! produces the response frame.
//!
//! ## Dispatch Rules
//!
//! ```text
//! request[0] ──> first table entry with that opcode?
//!                 │
//!                 ├── none ───────────────> UNKNOWN_COMMAND, zero payload
//!                 │
//!                 ├── entry, no handler ──> NOT_IMPLEMENTED
//!                 │
//!                 └── entry + handler ────> handler(request, response)
//!                                             ├── Ok  ──> OK
//!                                             └── Err ──> HANDLER_ERROR
//! ```
//!
//! Payload written by a failing handler is still sent to the client.

use crate::commands::table::CommandTable;
use crate::protocol::{RequestFrame, ResponseFrame, Status};
use std::sync::Arc;
use tracing::{debug, trace};

/// Dispatches requests against a shared, immutable command table.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    table: Arc<CommandTable>,
}

impl Dispatcher {
    /// Creates a dispatcher over `table`.
    pub fn new(table: Arc<CommandTable>) -> Self {
        Self { table }
    }

    /// Returns the table this dispatcher routes against.
    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Dispatches one request and returns the response to send back.
    ///
    /// Application-level failures are reported in-band through the status
    /// word; this never fails.
    pub fn dispatch(&self, request: &RequestFrame) -> ResponseFrame {
        let opcode = request.opcode();
        let mut response = ResponseFrame::new(Status::UnknownCommand);

        let Some(entry) = self.table.lookup(opcode) else {
            trace!(opcode, "Unknown command");
            return response;
        };

        let Some(handler) = entry.handler() else {
            response.set_status(Status::NotImplemented);
            return response;
        };

        response.set_status(Status::HandlerError);
        let status = match handler.handle(request, &mut response) {
            Ok(()) => Status::Ok,
            Err(e) => {
                debug!(opcode, error = %e, "Handler reported failure");
                Status::HandlerError
            }
        };

        // Handlers do not own word 0.
        response.set_status(status);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler::HandlerError;
    use crate::protocol::PAYLOAD_WORDS;

    fn create_dispatcher() -> Dispatcher {
        let table = CommandTable::builder()
            .register_fn(0x10, |request, response| {
                response[1] = request[1];
                Ok(())
            })
            .register_fn(0x20, |request, response| {
                response[1] = request[1].wrapping_mul(2);
                Err(HandlerError::new("always fails"))
            })
            .unimplemented(0x30)
            .register_fn(0x40, |_, response| {
                // Tries to claim a status; the dispatcher overrides it.
                response[0] = 999;
                response.payload_mut().fill(5);
                Ok(())
            })
            .build();
        Dispatcher::new(Arc::new(table))
    }

    #[test]
    fn test_echo_scenario() {
        let dispatcher = create_dispatcher();

        let response = dispatcher.dispatch(&RequestFrame::with_payload(0x10, &[7]).unwrap());
        assert_eq!(response.status(), Ok(Status::Ok));
        assert_eq!(response[1], 7);
        assert!(response.payload()[1..].iter().all(|w| *w == 0));
    }

    #[test]
    fn test_unknown_opcode() {
        let dispatcher = create_dispatcher();

        for opcode in [0, 0x11, 0x99, u32::MAX] {
            let request = RequestFrame::with_payload(opcode, &[1, 2, 3]).unwrap();
            let response = dispatcher.dispatch(&request);

            assert_eq!(response.status(), Ok(Status::UnknownCommand));
            assert!(response.payload().iter().all(|w| *w == 0));
        }
    }

    #[test]
    fn test_not_implemented() {
        let dispatcher = create_dispatcher();

        let response = dispatcher.dispatch(&RequestFrame::new(0x30));
        assert_eq!(response.status(), Ok(Status::NotImplemented));
        assert!(response.payload().iter().all(|w| *w == 0));
    }

    #[test]
    fn test_handler_failure_keeps_payload() {
        let dispatcher = create_dispatcher();

        let response = dispatcher.dispatch(&RequestFrame::with_payload(0x20, &[21]).unwrap());
        assert_eq!(response.status(), Ok(Status::HandlerError));
        assert_eq!(response[1], 42);
    }

    #[test]
    fn test_handler_cannot_set_status() {
        let dispatcher = create_dispatcher();

        let response = dispatcher.dispatch(&RequestFrame::new(0x40));
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.payload(), &[5u32; PAYLOAD_WORDS][..]);
    }

    #[test]
    fn test_handler_sees_handler_error_status() {
        let table = CommandTable::builder()
            .register_fn(0x70, |_, response| {
                let seen = response.status_code();
                response[1] = seen;
                Ok(())
            })
            .build();
        let dispatcher = Dispatcher::new(Arc::new(table));

        let response = dispatcher.dispatch(&RequestFrame::new(0x70));
        assert_eq!(response.status(), Ok(Status::Ok));
        assert_eq!(response[1], Status::HandlerError.code());
    }

    #[test]
    fn test_duplicate_opcode_first_wins() {
        let table = CommandTable::builder()
            .register_fn(0x50, |_, response| {
                response[1] = 1;
                Ok(())
            })
            .register_fn(0x50, |_, response| {
                response[1] = 2;
                Ok(())
            })
            .unimplemented(0x60)
            .register_fn(0x60, |_, _| Ok(()))
            .build();
        let dispatcher = Dispatcher::new(Arc::new(table));

        for _ in 0..3 {
            let response = dispatcher.dispatch(&RequestFrame::new(0x50));
            assert_eq!(response[1], 1);
        }
        let response = dispatcher.dispatch(&RequestFrame::new(0x60));
        assert_eq!(response.status(), Ok(Status::NotImplemented));
    }

    #[test]
    fn test_empty_table() {
        let dispatcher = Dispatcher::new(Arc::new(CommandTable::default()));
        let response = dispatcher.dispatch(&RequestFrame::new(0x10));
        assert_eq!(response.status(), Ok(Status::UnknownCommand));
    }
}
