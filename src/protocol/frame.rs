//! Request and Response Frames
//!
//! This module defines the two frame types exchanged on a connection and
//! their big-endian wire codec.
//!
//! A frame is always exactly [`FRAME_LEN`] bytes. There is no length prefix
//! and no delimiter: the reader knows a frame is complete once it has
//! buffered [`FRAME_LEN`] bytes. Unused payload words are zero.
//!
//! ## Example
//!
//! ```
//! use msgsrv::protocol::{RequestFrame, ResponseFrame, Status};
//! use bytes::BytesMut;
//!
//! let request = RequestFrame::with_payload(0x10, &[7]).unwrap();
//!
//! let mut buf = BytesMut::new();
//! request.encode(&mut buf);
//! assert_eq!(buf.len(), 128);
//! assert_eq!(&buf[..8], &[0, 0, 0, 0x10, 0, 0, 0, 7]);
//!
//! let decoded = RequestFrame::decode(&buf).unwrap();
//! assert_eq!(decoded.opcode(), 0x10);
//!
//! let mut response = ResponseFrame::new(Status::Ok);
//! response[1] = decoded[1];
//! assert_eq!(response.status(), Ok(Status::Ok));
//! ```

use crate::protocol::types::{Status, FRAME_LEN, FRAME_WORDS, PAYLOAD_WORDS};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::ops::{Index, IndexMut};
use thiserror::Error;

/// Errors that can occur while building or decoding frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than a full frame were supplied
    #[error("incomplete frame: got {got} bytes, need {need}")]
    Incomplete { got: usize, need: usize },

    /// More payload words than fit after word 0
    #[error("payload too long: {len} words (max: {max})")]
    PayloadTooLong { len: usize, max: usize },

    /// Word 0 of a response is not a known status code
    #[error("unknown status code: {0}")]
    UnknownStatus(u32),
}

/// Writes all words of a frame in network byte order.
fn put_words(words: &[u32; FRAME_WORDS], dst: &mut BytesMut) {
    dst.reserve(FRAME_LEN);
    for word in words {
        dst.put_u32(*word);
    }
}

/// Reads the first frame's worth of words from `src`.
fn get_words(src: &[u8]) -> Result<[u32; FRAME_WORDS], FrameError> {
    if src.len() < FRAME_LEN {
        return Err(FrameError::Incomplete {
            got: src.len(),
            need: FRAME_LEN,
        });
    }

    let mut src = &src[..FRAME_LEN];
    let mut words = [0u32; FRAME_WORDS];
    for word in words.iter_mut() {
        *word = src.get_u32();
    }
    Ok(words)
}

/// Copies `payload` into words 1.. of a frame.
fn fill_payload(words: &mut [u32; FRAME_WORDS], payload: &[u32]) -> Result<(), FrameError> {
    if payload.len() > PAYLOAD_WORDS {
        return Err(FrameError::PayloadTooLong {
            len: payload.len(),
            max: PAYLOAD_WORDS,
        });
    }
    words[1..=payload.len()].copy_from_slice(payload);
    Ok(())
}

/// Number of payload words up to and including the last non-zero one.
fn significant_len(payload: &[u32]) -> usize {
    payload
        .iter()
        .rposition(|w| *w != 0)
        .map_or(0, |last| last + 1)
}

/// A request frame: word 0 is the opcode, words 1..=31 are opaque payload.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RequestFrame {
    words: [u32; FRAME_WORDS],
}

impl RequestFrame {
    /// Creates a request for `opcode` with a zero payload.
    pub fn new(opcode: u32) -> Self {
        let mut words = [0u32; FRAME_WORDS];
        words[0] = opcode;
        Self { words }
    }

    /// Creates a request for `opcode` whose leading payload words are `payload`.
    ///
    /// Returns an error if `payload` has more than 31 words.
    pub fn with_payload(opcode: u32, payload: &[u32]) -> Result<Self, FrameError> {
        let mut frame = Self::new(opcode);
        fill_payload(&mut frame.words, payload)?;
        Ok(frame)
    }

    /// Wraps a complete set of raw words.
    pub fn from_words(words: [u32; FRAME_WORDS]) -> Self {
        Self { words }
    }

    /// Returns the opcode (word 0).
    pub fn opcode(&self) -> u32 {
        self.words[0]
    }

    /// Returns the payload words (words 1..=31).
    pub fn payload(&self) -> &[u32] {
        &self.words[1..]
    }

    /// Returns all 32 words.
    pub fn words(&self) -> &[u32; FRAME_WORDS] {
        &self.words
    }

    /// Appends the wire encoding of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        put_words(&self.words, dst);
    }

    /// Returns the wire encoding of this frame.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decodes a request from the first [`FRAME_LEN`] bytes of `src`.
    pub fn decode(src: &[u8]) -> Result<Self, FrameError> {
        get_words(src).map(Self::from_words)
    }
}

impl Index<usize> for RequestFrame {
    type Output = u32;

    fn index(&self, index: usize) -> &u32 {
        &self.words[index]
    }
}

impl fmt::Debug for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = self.payload();
        f.debug_struct("RequestFrame")
            .field("opcode", &format_args!("{:#x}", self.opcode()))
            .field("payload", &&payload[..significant_len(payload)])
            .finish()
    }
}

/// A response frame: word 0 is the status code, words 1..=31 are the
/// payload written by the handler.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResponseFrame {
    words: [u32; FRAME_WORDS],
}

impl ResponseFrame {
    /// Creates a response with the given status and a zero payload.
    pub fn new(status: Status) -> Self {
        let mut words = [0u32; FRAME_WORDS];
        words[0] = status.code();
        Self { words }
    }

    /// Creates a response whose leading payload words are `payload`.
    pub fn with_payload(status: Status, payload: &[u32]) -> Result<Self, FrameError> {
        let mut frame = Self::new(status);
        fill_payload(&mut frame.words, payload)?;
        Ok(frame)
    }

    /// Wraps a complete set of raw words without validating the status word.
    pub fn from_words(words: [u32; FRAME_WORDS]) -> Self {
        Self { words }
    }

    /// Returns the raw status word (word 0).
    pub fn status_code(&self) -> u32 {
        self.words[0]
    }

    /// Returns the status, or an error if word 0 is not a known code.
    pub fn status(&self) -> Result<Status, FrameError> {
        Status::from_code(self.words[0]).ok_or(FrameError::UnknownStatus(self.words[0]))
    }

    /// Overwrites the status word.
    pub fn set_status(&mut self, status: Status) {
        self.words[0] = status.code();
    }

    /// Returns the payload words (words 1..=31).
    pub fn payload(&self) -> &[u32] {
        &self.words[1..]
    }

    /// Returns the payload words for writing.
    pub fn payload_mut(&mut self) -> &mut [u32] {
        &mut self.words[1..]
    }

    /// Returns all 32 words.
    pub fn words(&self) -> &[u32; FRAME_WORDS] {
        &self.words
    }

    /// Appends the wire encoding of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        put_words(&self.words, dst);
    }

    /// Returns the wire encoding of this frame.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decodes a response from the first [`FRAME_LEN`] bytes of `src`.
    ///
    /// The status word is not validated here; see [`ResponseFrame::status`].
    pub fn decode(src: &[u8]) -> Result<Self, FrameError> {
        get_words(src).map(Self::from_words)
    }
}

impl Index<usize> for ResponseFrame {
    type Output = u32;

    fn index(&self, index: usize) -> &u32 {
        &self.words[index]
    }
}

impl IndexMut<usize> for ResponseFrame {
    fn index_mut(&mut self, index: usize) -> &mut u32 {
        &mut self.words[index]
    }
}

impl fmt::Debug for ResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = self.payload();
        f.debug_struct("ResponseFrame")
            .field("status", &self.status_code())
            .field("payload", &&payload[..significant_len(payload)])
            .finish()
    }
}
