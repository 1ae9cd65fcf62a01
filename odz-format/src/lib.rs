//! # ODZ Format
//!
//! LZ77 + canonical Huffman block codec and the ODZ v2 container format.
//!
//! ## Layers
//!
//! - [`tables`]: the literal/length and distance alphabets (C3).
//! - [`huffman`]: code-length assignment, canonical codes, and the
//!   two-level decode table (C2).
//! - [`lz`]: the LZ77 match finder (C4).
//! - [`block`]: per-block compression/decompression, including the
//!   stored-vs-Huffman decision (C5/C6).
//! - [`container`]: file header, block framing, and
//!   [`container::compress`]/[`container::decompress`], the crate's public
//!   entry points (C7).
//!
//! ## Example
//!
//! ```rust
//! use odz_format::{compress, decompress, Options};
//! use std::io::Cursor;
//!
//! let original = b"Hello, ODZ! Hello, ODZ!";
//!
//! let mut compressed = Vec::new();
//! compress(Cursor::new(&original[..]), &mut compressed, Options::default()).unwrap();
//!
//! let mut decompressed = Vec::new();
//! decompress(Cursor::new(&compressed), &mut decompressed, Options::default()).unwrap();
//! assert_eq!(decompressed, original);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod container;
pub mod huffman;
pub mod lz;
pub mod tables;

// Re-exports
pub use container::{compress, decompress, Options, BLOCK_SIZE};
pub use huffman::{HuffmanBuilder, HuffmanEncoder, HuffmanTable};
pub use lz::{LzEncoder, LzToken};
