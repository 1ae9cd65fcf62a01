//! Container format (C7): file header, block framing, and size reconciliation.
//!
//! A stream is a 12-byte file header followed by one or more blocks, each no
//! larger than [`BLOCK_SIZE`] of raw data. Header and block-framing fields
//! are plain little-endian bytes; only a Huffman block's payload is a bit
//! stream, and that bit stream starts fresh at each block (see
//! [`crate::block`]).

use crate::block::{compress_block, decompress_block, BlockEncoding};
use crate::huffman::HuffmanTable;
use crate::lz::LzEncoder;
use odz_core::error::{OdzError, Result};
use std::io::{Read, Write};

/// Maximum size of one block's raw (uncompressed) data.
pub const BLOCK_SIZE: usize = 1 << 20;

const MAGIC: [u8; 3] = *b"ODZ";
const VERSION: u8 = 2;

const BLOCK_STORED: u8 = 0;
const BLOCK_HUFFMAN: u8 = 1;

/// Configuration shared by [`compress`] and [`decompress`].
///
/// There is no persisted configuration; an `Options` value is built fresh
/// for each call.
#[derive(Default)]
pub struct Options<'a> {
    /// Invoked after each block with `(bytes_of_output_so_far,
    /// total_expected_bytes_or_zero)`. Returning `false` aborts the
    /// operation with an I/O-class error.
    pub progress: Option<&'a mut dyn FnMut(u64, u64) -> bool>,
}

fn report(options: &mut Options, processed: u64, total: u64) -> Result<()> {
    if let Some(cb) = options.progress.as_mut() {
        if !cb(processed, total) {
            return Err(OdzError::Io(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                "aborted by progress callback",
            )));
        }
    }
    Ok(())
}

fn write_u32_le<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_u32_le<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn write_block_header<W: Write>(w: &mut W, is_last: bool, block_type: u8) -> Result<()> {
    let byte = (block_type << 1) | (is_last as u8);
    w.write_all(&[byte])?;
    Ok(())
}

/// Compress `input` into the ODZ container format, writing to `output`.
///
/// The file header records the total input size, which must be known before
/// any block data is written; `input` is therefore read to completion
/// up front rather than streamed block by block.
pub fn compress<R: Read, W: Write>(mut input: R, mut output: W, mut options: Options) -> Result<()> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;
    let original_size = data.len() as u64;

    output.write_all(&MAGIC)?;
    output.write_all(&[VERSION])?;
    output.write_all(&original_size.to_le_bytes())?;

    if data.is_empty() {
        write_block_header(&mut output, true, BLOCK_STORED)?;
        write_u32_le(&mut output, 0)?;
        report(&mut options, 0, original_size)?;
        return Ok(());
    }

    let mut lz = LzEncoder::new();
    let mut total_out = 0u64;
    let mut offset = 0usize;

    while offset < data.len() {
        let end = (offset + BLOCK_SIZE).min(data.len());
        let chunk = &data[offset..end];
        let is_last = end == data.len();

        match compress_block(chunk, &mut lz)? {
            BlockEncoding::Stored => {
                write_block_header(&mut output, is_last, BLOCK_STORED)?;
                write_u32_le(&mut output, chunk.len() as u32)?;
                output.write_all(chunk)?;
            }
            BlockEncoding::Huffman(payload) => {
                write_block_header(&mut output, is_last, BLOCK_HUFFMAN)?;
                write_u32_le(&mut output, chunk.len() as u32)?;
                write_u32_le(&mut output, payload.len() as u32)?;
                output.write_all(&payload)?;
            }
        }

        total_out += chunk.len() as u64;
        offset = end;
        report(&mut options, total_out, original_size)?;
    }

    Ok(())
}

/// Decompress an ODZ container read from `input`, writing the original data
/// to `output`.
pub fn decompress<R: Read, W: Write>(mut input: R, mut output: W, mut options: Options) -> Result<()> {
    let mut hdr = [0u8; 12];
    input.read_exact(&mut hdr)?;
    if hdr[0..3] != MAGIC {
        return Err(OdzError::format("not an ODZ stream (bad magic)"));
    }
    if hdr[3] != VERSION {
        return Err(OdzError::format(format!("unsupported ODZ version {}", hdr[3])));
    }
    let original_size = u64::from_le_bytes(hdr[4..12].try_into().unwrap());

    let mut block_buf = Vec::new();
    let mut ll_table = HuffmanTable::new_empty();
    let mut dist_table = HuffmanTable::new_empty();
    let mut total_out = 0u64;

    loop {
        let mut hdr_byte = [0u8; 1];
        input.read_exact(&mut hdr_byte)?;
        let is_last = hdr_byte[0] & 1 != 0;
        let block_type = (hdr_byte[0] >> 1) & 3;

        match block_type {
            t if t == BLOCK_STORED => {
                let raw_size = read_u32_le(&mut input)? as usize;
                if raw_size > BLOCK_SIZE {
                    return Err(OdzError::corrupt("block header", "raw_size exceeds BLOCK_SIZE"));
                }
                block_buf.clear();
                block_buf.try_reserve(raw_size).map_err(|_| OdzError::oom(raw_size))?;
                block_buf.resize(raw_size, 0);
                input.read_exact(&mut block_buf)?;
                output.write_all(&block_buf)?;
                total_out += raw_size as u64;
            }
            t if t == BLOCK_HUFFMAN => {
                let raw_size = read_u32_le(&mut input)? as usize;
                let comp_size = read_u32_le(&mut input)? as usize;
                if raw_size > BLOCK_SIZE {
                    return Err(OdzError::corrupt("block header", "raw_size exceeds BLOCK_SIZE"));
                }

                let mut payload = Vec::new();
                payload.try_reserve(comp_size).map_err(|_| OdzError::oom(comp_size))?;
                payload.resize(comp_size, 0);
                input.read_exact(&mut payload)?;

                block_buf.clear();
                decompress_block(&payload, raw_size, &mut ll_table, &mut dist_table, &mut block_buf)?;
                output.write_all(&block_buf)?;
                total_out += raw_size as u64;
            }
            _ => return Err(OdzError::format("reserved block type")),
        }

        report(&mut options, total_out, original_size)?;

        if is_last {
            break;
        }
    }

    if total_out != original_size {
        return Err(OdzError::corrupt("container", "total decoded size does not match header"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(data: &[u8]) {
        let mut compressed = Vec::new();
        compress(Cursor::new(data), &mut compressed, Options::default()).unwrap();

        let mut decompressed = Vec::new();
        decompress(Cursor::new(&compressed), &mut decompressed, Options::default()).unwrap();

        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_empty_input() {
        roundtrip(&[]);

        let mut compressed = Vec::new();
        compress(Cursor::new(&[][..]), &mut compressed, Options::default()).unwrap();
        // Header (12 bytes) + block header byte (1) + raw_size (4).
        assert_eq!(compressed.len(), 17);
        assert_eq!(&compressed[0..3], b"ODZ");
        assert_eq!(compressed[12], 1); // is_last=1, block_type=stored(0)
    }

    #[test]
    fn test_single_block_roundtrip() {
        roundtrip(b"Hello, ODZ! Hello, ODZ! Hello, ODZ!");
    }

    #[test]
    fn test_exactly_one_block() {
        let data = vec![b'z'; BLOCK_SIZE];
        roundtrip(&data);
    }

    #[test]
    fn test_two_blocks() {
        let mut data = vec![0u8; BLOCK_SIZE + 1];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        roundtrip(&data);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bogus = vec![b'X', b'D', b'Z', 2];
        bogus.extend_from_slice(&0u64.to_le_bytes());
        bogus.push(1);
        bogus.extend_from_slice(&0u32.to_le_bytes());

        let mut out = Vec::new();
        let result = decompress(Cursor::new(&bogus), &mut out, Options::default());
        assert!(matches!(result, Err(OdzError::Format { .. })));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut bogus = vec![b'O', b'D', b'Z', 99];
        bogus.extend_from_slice(&0u64.to_le_bytes());
        bogus.push(1);
        bogus.extend_from_slice(&0u32.to_le_bytes());

        let mut out = Vec::new();
        let result = decompress(Cursor::new(&bogus), &mut out, Options::default());
        assert!(matches!(result, Err(OdzError::Format { .. })));
    }

    #[test]
    fn test_rejects_reserved_block_type() {
        let mut bogus = vec![b'O', b'D', b'Z', 2];
        bogus.extend_from_slice(&0u64.to_le_bytes());
        bogus.push(0b0000_0101); // block_type = 2 (reserved), is_last = 1

        let mut out = Vec::new();
        let result = decompress(Cursor::new(&bogus), &mut out, Options::default());
        assert!(matches!(result, Err(OdzError::Format { .. })));
    }

    #[test]
    fn test_rejects_size_mismatch() {
        let mut stream = Vec::new();
        compress(Cursor::new(b"mismatch me"), &mut stream, Options::default()).unwrap();
        // Lie about the original size in the header.
        let bad_size = 9999u64.to_le_bytes();
        stream[4..12].copy_from_slice(&bad_size);

        let mut out = Vec::new();
        let result = decompress(Cursor::new(&stream), &mut out, Options::default());
        assert!(matches!(result, Err(OdzError::Corrupt { .. })));
    }

    #[test]
    fn test_progress_callback_invoked() {
        let data = vec![b'a'; BLOCK_SIZE + 10];
        let mut compressed = Vec::new();
        let mut calls = Vec::new();
        {
            let mut cb = |processed: u64, total: u64| {
                calls.push((processed, total));
                true
            };
            let options = Options { progress: Some(&mut cb) };
            compress(Cursor::new(&data), &mut compressed, options).unwrap();
        }
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, data.len() as u64);
    }

    #[test]
    fn test_progress_callback_abort() {
        let data = vec![b'a'; BLOCK_SIZE + 10];
        let mut compressed = Vec::new();
        let mut cb = |_processed: u64, _total: u64| false;
        let options = Options { progress: Some(&mut cb) };
        let result = compress(Cursor::new(&data), &mut compressed, options);
        assert!(matches!(result, Err(OdzError::Io(_))));
    }

    #[test]
    fn test_rejects_stored_block_raw_size_over_block_size() {
        let mut stream = Vec::new();
        stream.extend_from_slice(b"ODZ");
        stream.push(2); // version
        stream.extend_from_slice(&0u64.to_le_bytes()); // original_size (unchecked before the failure)
        stream.push(0b0000_0001); // is_last=1, block_type=stored(0)
        stream.extend_from_slice(&((BLOCK_SIZE as u32) + 1).to_le_bytes()); // raw_size

        let mut out = Vec::new();
        let result = decompress(Cursor::new(&stream), &mut out, Options::default());
        assert!(matches!(result, Err(OdzError::Corrupt { .. })));
    }

    #[test]
    fn test_rejects_huffman_block_raw_size_over_block_size() {
        let mut stream = Vec::new();
        stream.extend_from_slice(b"ODZ");
        stream.push(2);
        stream.extend_from_slice(&0u64.to_le_bytes());
        stream.push(0b0000_0011); // is_last=1, block_type=huffman(1)
        stream.extend_from_slice(&((BLOCK_SIZE as u32) + 1).to_le_bytes()); // raw_size
        stream.extend_from_slice(&0u32.to_le_bytes()); // comp_size (unchecked before the failure)

        let mut out = Vec::new();
        let result = decompress(Cursor::new(&stream), &mut out, Options::default());
        assert!(matches!(result, Err(OdzError::Corrupt { .. })));
    }

    #[test]
    fn test_truncated_huffman_payload_in_stream_is_io_error() {
        // Unlike a payload already buffered in memory (see
        // `block::tests::test_truncated_payload_is_corrupt`), the container
        // reads a block's declared byte count directly off the underlying
        // stream with `read_exact`. A stream that is cut short of that
        // promise -- the `fread`-truncation case -- fails the read itself
        // and surfaces as an I/O error, not a Corrupt decode.
        let data = b"The quick brown fox jumps over the lazy dog, over and over and over again.";
        let mut full = Vec::new();
        compress(Cursor::new(&data[..]), &mut full, Options::default()).unwrap();

        let truncated = &full[..full.len() - 1];
        let mut out = Vec::new();
        let result = decompress(Cursor::new(truncated), &mut out, Options::default());
        assert!(matches!(result, Err(OdzError::Io(_))));
    }
}
