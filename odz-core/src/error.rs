//! Error types for ODZ operations.
//!
//! The error type mirrors the closed status taxonomy of the format: every
//! operation either succeeds or fails with exactly one of an I/O, out-of-memory,
//! format, or corruption error. There is no open-ended "other" variant.

use std::io;
use thiserror::Error;

/// The error type for ODZ compression and decompression.
#[derive(Debug, Error)]
pub enum OdzError {
    /// I/O error from the underlying reader or writer, or a caller-initiated
    /// abort via the progress callback.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Allocation failure for a size read from untrusted input.
    #[error("out of memory: failed to allocate {needed} bytes")]
    Oom {
        /// Number of bytes that could not be allocated.
        needed: usize,
    },

    /// The container is not a recognized ODZ stream: bad magic, unsupported
    /// version, or a reserved block type.
    #[error("format error: {message}")]
    Format {
        /// Description of the format violation.
        message: String,
    },

    /// The container is structurally an ODZ stream but its contents violate
    /// an invariant: a bad Huffman code length vector, an out-of-range
    /// length/distance, a size mismatch between a block and its header, etc.
    #[error("corrupt data at {context}: {message}")]
    Corrupt {
        /// Where in the stream the corruption was detected (e.g. "block 3").
        context: String,
        /// Description of the violated invariant.
        message: String,
    },
}

/// Result type alias for ODZ operations.
pub type Result<T> = std::result::Result<T, OdzError>;

impl OdzError {
    /// Create an out-of-memory error.
    pub fn oom(needed: usize) -> Self {
        Self::Oom { needed }
    }

    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create a corruption error.
    pub fn corrupt(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Short human-readable string for a status, for parity with a C `strerror`
/// style API. Equivalent to `err.to_string()`.
pub fn strerror(err: &OdzError) -> String {
    err.to_string()
}
