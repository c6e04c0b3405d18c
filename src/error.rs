//! Error types for the GLYPH codec and streaming protocol.
//!
//! One [`Error`] enum covers the whole taxonomy:
//!
//! - **Syntax**: malformed GLYPH text, with a byte offset into the input
//! - **Integrity**: a frame payload failed its CRC-32 check
//! - **BaseMismatch**: a patch was computed against a different state than the
//!   stream currently holds
//! - **Sequence**: a gap or duplicate in a stream's sequence numbers
//! - **Path**: a patch path did not resolve against the target value
//! - **Frame**: a malformed or oversized frame header
//!
//! None of these are retried internally; every error is a deterministic
//! function of its input, so the caller decides recovery.
//!
//! ## Examples
//!
//! ```rust
//! use glyph::{parse, Error};
//!
//! let result = parse("{unclosed=1");
//! match result {
//!     Err(Error::Syntax { offset, .. }) => assert!(offset > 0),
//!     other => panic!("expected syntax error, got {:?}", other),
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Whether a [`Error::Sequence`] was caused by a gap or a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFault {
    /// The frame's sequence number skipped past the expected one.
    Gap,
    /// The frame's sequence number was already seen.
    Duplicate,
}

impl fmt::Display for SequenceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceFault::Gap => f.write_str("gap"),
            SequenceFault::Duplicate => f.write_str("duplicate"),
        }
    }
}

/// All errors produced by this crate.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed GLYPH text. `offset` is a byte offset into the input.
    #[error("syntax error at byte {offset}: {reason}")]
    Syntax { offset: usize, reason: String },

    /// CRC-32 declared in a frame header did not match the payload.
    #[error("integrity error: crc mismatch (declared {declared:08x}, computed {computed:08x})")]
    Integrity { declared: u32, computed: u32 },

    /// A patch frame's base hash did not match the stream's current state.
    #[error("base mismatch on stream {sid} seq {seq}: patch computed against {declared}, stream is at {current}")]
    BaseMismatch {
        sid: u64,
        seq: u64,
        declared: String,
        current: String,
    },

    /// Sequence-number violation on one stream.
    #[error("sequence {fault} on stream {sid}: expected {expected}, got {got}")]
    Sequence {
        sid: u64,
        expected: u64,
        got: u64,
        fault: SequenceFault,
    },

    /// A patch path failed to resolve.
    #[error("path error at `{path}`: {reason}")]
    Path { path: String, reason: String },

    /// Malformed or oversized frame header.
    #[error("frame error: {0}")]
    Frame(String),

    /// Generic message (serde bridge).
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Creates a syntax error at a byte offset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use glyph::Error;
    ///
    /// let err = Error::syntax(12, "expected '}'");
    /// assert!(err.to_string().contains("byte 12"));
    /// ```
    pub fn syntax(offset: usize, reason: impl Into<String>) -> Self {
        Error::Syntax {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a path error for a patch operation that did not resolve.
    pub fn path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Path {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a frame error for a malformed or oversized header.
    pub fn frame(reason: impl Into<String>) -> Self {
        Error::Frame(reason.into())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
