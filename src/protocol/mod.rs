//! Fixed-Frame Wire Protocol
//!
//! This module provides the wire format spoken between clients and the server.
//!
//! ## Overview
//!
//! Every exchange is a single request frame followed by a single response
//! frame. Both are 32 big-endian `u32` words (128 bytes). The first word of
//! a request selects the command (the *opcode*); the first word of a
//! response carries a [`Status`].
//!
//! ## Modules
//!
//! - `types`: Frame size constants and the `Status` enum
//! - `frame`: `RequestFrame` / `ResponseFrame` and their codec
//!
//! ## Example
//!
//! ```
//! use msgsrv::protocol::{RequestFrame, ResponseFrame, Status, FRAME_LEN};
//!
//! let request = RequestFrame::with_payload(0x10, &[7]).unwrap();
//! assert_eq!(request.to_bytes().len(), FRAME_LEN);
//!
//! let response = ResponseFrame::with_payload(Status::Ok, &[7]).unwrap();
//! assert_eq!(response.words()[..2], [200, 7]);
//! ```

pub mod frame;
pub mod types;

// Re-export commonly used types for convenience
pub use frame::{FrameError, RequestFrame, ResponseFrame};
pub use types::{Status, FRAME_LEN, FRAME_WORDS, PAYLOAD_WORDS};
