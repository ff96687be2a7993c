//! Wire Constants and Status Codes
//!
//! Every message on the wire is a single fixed-size frame of 32 unsigned
//! 32-bit words, sent in network byte order (big-endian).
//!
//! ## Frame Layout
//!
//! ```text
//!  word:   0          1          2                      31
//!        ┌──────────┬──────────┬──────────┬── ... ──┬──────────┐
//!  req   │  opcode  │ payload  │ payload  │         │ payload  │
//!        ├──────────┼──────────┼──────────┼── ... ──┼──────────┤
//!  resp  │  status  │ payload  │ payload  │         │ payload  │
//!        └──────────┴──────────┴──────────┴── ... ──┴──────────┘
//!          4 bytes    4 bytes                          = 128 bytes
//! ```
//!
//! ## Status Codes
//!
//! | Code | Meaning                                       |
//! |------|-----------------------------------------------|
//! | 200  | Handler ran and reported success              |
//! | 100  | No command registered for the opcode          |
//! | 110  | Opcode registered, but no handler is bound    |
//! | 120  | Handler ran and reported failure              |

use std::fmt;

/// Number of 32-bit words in every frame (request and response).
pub const FRAME_WORDS: usize = 32;

/// Number of payload words following the opcode/status word.
pub const PAYLOAD_WORDS: usize = FRAME_WORDS - 1;

/// Size of a frame on the wire, in bytes.
pub const FRAME_LEN: usize = FRAME_WORDS * 4;

/// Status code carried in word 0 of every response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    /// The handler ran and reported success
    Ok = 200,
    /// No table entry matches the opcode
    UnknownCommand = 100,
    /// The opcode is registered without a handler
    NotImplemented = 110,
    /// The handler ran and reported failure
    HandlerError = 120,
}

impl Status {
    /// All status codes, in ascending code order.
    pub const ALL: [Status; 4] = [
        Status::UnknownCommand,
        Status::NotImplemented,
        Status::HandlerError,
        Status::Ok,
    ];

    /// Returns the numeric code written to the wire.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Parses a raw status word.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            200 => Some(Status::Ok),
            100 => Some(Status::UnknownCommand),
            110 => Some(Status::NotImplemented),
            120 => Some(Status::HandlerError),
            _ => None,
        }
    }

    /// Returns true if the command was executed successfully.
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "OK",
            Status::UnknownCommand => "UNKNOWN_COMMAND",
            Status::NotImplemented => "NOT_IMPLEMENTED",
            Status::HandlerError => "HANDLER_ERROR",
        };
        write!(f, "{} ({})", name, self.code())
    }
}
