//! Command Table
//!
//! The table maps opcodes to handlers. It is built once, before the server
//! starts, and is immutable afterwards: the event loop only ever reads it.
//!
//! Lookup is a linear scan in registration order and the first matching entry
//! wins. Registering the same opcode twice is allowed, but the later entry is
//! unreachable.
//!
//! ## Example
//!
//! ```
//! use msgsrv::commands::CommandTable;
//!
//! let table = CommandTable::builder()
//!     .register_fn(0x10, |request, response| {
//!         response[1] = request[1];
//!         Ok(())
//!     })
//!     .unimplemented(0x20)
//!     .build();
//!
//! assert_eq!(table.len(), 2);
//! assert!(table.lookup(0x10).unwrap().handler().is_some());
//! assert!(table.lookup(0x20).unwrap().handler().is_none());
//! assert!(table.lookup(0x30).is_none());
//! ```

use crate::commands::handler::{CommandHandler, FnHandler, HandlerResult};
use crate::protocol::{RequestFrame, ResponseFrame};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Practical limit on the number of table entries.
///
/// Larger tables still work, but lookup is linear, so building one logs a
/// warning.
pub const MAX_COMMANDS: usize = 32;

/// One registered command.
#[derive(Clone)]
pub struct CommandEntry {
    opcode: u32,
    handler: Option<Arc<dyn CommandHandler>>,
}

impl CommandEntry {
    /// Returns the opcode this entry answers to.
    pub fn opcode(&self) -> u32 {
        self.opcode
    }

    /// Returns the bound handler, if any.
    pub fn handler(&self) -> Option<&dyn CommandHandler> {
        self.handler.as_deref()
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("opcode", &format_args!("{:#x}", self.opcode))
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Immutable opcode-to-handler table.
#[derive(Clone, Debug, Default)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    /// Starts building a table.
    pub fn builder() -> CommandTableBuilder {
        CommandTableBuilder::default()
    }

    /// Finds the first entry registered for `opcode`.
    pub fn lookup(&self, opcode: u32) -> Option<&CommandEntry> {
        self.entries.iter().find(|entry| entry.opcode == opcode)
    }

    /// Returns all entries in registration order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Returns the number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for [`CommandTable`].
#[derive(Default)]
pub struct CommandTableBuilder {
    entries: Vec<CommandEntry>,
}

impl CommandTableBuilder {
    /// Registers a handler for `opcode`.
    pub fn register<H>(mut self, opcode: u32, handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        self.entries.push(CommandEntry {
            opcode,
            handler: Some(Arc::new(handler)),
        });
        self
    }

    /// Registers a handler that is already shared elsewhere.
    pub fn register_shared(mut self, opcode: u32, handler: Arc<dyn CommandHandler>) -> Self {
        self.entries.push(CommandEntry {
            opcode,
            handler: Some(handler),
        });
        self
    }

    /// Registers a closure as the handler for `opcode`.
    pub fn register_fn<F>(self, opcode: u32, f: F) -> Self
    where
        F: Fn(&RequestFrame, &mut ResponseFrame) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(opcode, FnHandler(f))
    }

    /// Reserves `opcode` without a handler.
    ///
    /// Requests for it are answered with `NOT_IMPLEMENTED` instead of
    /// `UNKNOWN_COMMAND`.
    pub fn unimplemented(mut self, opcode: u32) -> Self {
        self.entries.push(CommandEntry {
            opcode,
            handler: None,
        });
        self
    }

    /// Finishes the table.
    pub fn build(self) -> CommandTable {
        if self.entries.len() > MAX_COMMANDS {
            warn!(
                commands = self.entries.len(),
                max = MAX_COMMANDS,
                "Command table exceeds the recommended size"
            );
        }

        CommandTable {
            entries: self.entries,
        }
    }
}

impl fmt::Debug for CommandTableBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTableBuilder")
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler::HandlerError;

    #[test]
    fn test_empty_table() {
        let table = CommandTable::builder().build();
        assert!(table.is_empty());
        assert!(table.lookup(0).is_none());
    }

    #[test]
    fn test_registration_order_is_kept() {
        let table = CommandTable::builder()
            .unimplemented(3)
            .register_fn(1, |_, _| Ok(()))
            .unimplemented(2)
            .build();

        let opcodes: Vec<u32> = table.entries().iter().map(|e| e.opcode()).collect();
        assert_eq!(opcodes, vec![3, 1, 2]);
    }

    #[test]
    fn test_first_registration_wins() {
        let table = CommandTable::builder()
            .unimplemented(0x10)
            .register_fn(0x10, |_, _| Ok(()))
            .build();

        assert_eq!(table.len(), 2);
        assert!(table.lookup(0x10).unwrap().handler().is_none());
    }

    #[test]
    fn test_register_shared() {
        let shared: Arc<dyn CommandHandler> =
            Arc::new(FnHandler(|_: &RequestFrame, _: &mut ResponseFrame| -> HandlerResult {
                Err(HandlerError::new("nope"))
            }));

        let table = CommandTable::builder()
            .register_shared(1, Arc::clone(&shared))
            .register_shared(2, shared)
            .build();

        assert!(table.lookup(1).unwrap().handler().is_some());
        assert!(table.lookup(2).unwrap().handler().is_some());
    }

    #[test]
    fn test_oversized_table_still_builds() {
        let mut builder = CommandTable::builder();
        for opcode in 0..(MAX_COMMANDS as u32 + 8) {
            builder = builder.unimplemented(opcode);
        }

        let table = builder.build();
        assert_eq!(table.len(), MAX_COMMANDS + 8);
        assert!(table.lookup(MAX_COMMANDS as u32 + 7).is_some());
    }

    #[test]
    fn test_entry_debug() {
        let table = CommandTable::builder().unimplemented(0x20).build();
        assert_eq!(
            format!("{:?}", table.entries()[0]),
            "CommandEntry { opcode: 0x20, has_handler: false }"
        );
    }
}
