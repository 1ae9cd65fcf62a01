//! # ODZ Core
//!
//! Core components shared by the ODZ codec: bit-level I/O and the closed
//! error type.
//!
//! - [`bitstream`]: LSB-first bit I/O for Huffman codes and extra-bit fields.
//! - [`error`]: the `OdzError`/`Result` status taxonomy.
//!
//! ## Architecture
//!
//! ODZ is a single-pass pipeline, not a layered container stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Container (odz-format::container)                       │
//! │     file header, block iteration, size reconciliation  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Block codec (odz-format::block)                          │
//! │     stored vs. Huffman decision, token encode/decode    │
//! ├─────────────────────────────────────────────────────────┤
//! │ LZ77 + Huffman (odz-format::lz, odz-format::huffman)     │
//! ├─────────────────────────────────────────────────────────┤
//! │ BitStream (this crate)                                   │
//! │     BitReader/BitWriter                                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use odz_core::bitstream::{BitReader, BitWriter};
//! use std::io::Cursor;
//!
//! let mut output = Vec::new();
//! {
//!     let mut writer = BitWriter::new(&mut output);
//!     writer.write_bits(0b101, 3).unwrap();
//!     writer.flush().unwrap();
//! }
//!
//! let mut reader = BitReader::new(Cursor::new(output));
//! assert_eq!(reader.read_bits(3), 0b101);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod error;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use error::{OdzError, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::error::{OdzError, Result};
}
