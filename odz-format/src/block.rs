//! Block compressor (C5) and block decompressor (C6).
//!
//! A block is LZ77-tokenized, its two alphabets (literal/length, distance)
//! are each given a canonical Huffman code, and the token stream is written
//! as a self-contained, byte-aligned bit stream. If that would be larger
//! than just storing the block's raw bytes, the block is stored instead.

use crate::huffman::{HuffmanBuilder, HuffmanEncoder, HuffmanTable, MAX_CODE_LENGTH};
use crate::lz::{LzEncoder, LzToken};
use crate::tables::{
    decode_distance, decode_length, distance_to_code, length_to_code, DISTANCE_ALPHABET_SIZE,
    DISTANCE_EXTRA_BITS, END_OF_BLOCK, LENGTH_EXTRA_BITS, LITLEN_ALPHABET_SIZE,
};
use odz_core::bitstream::{BitReader, BitWriter};
use odz_core::error::{OdzError, Result};
use std::io::Cursor;

const NLL_BITS: u8 = 9;
const NDIST_BITS: u8 = 5;
const LEN_FIELD_BITS: u8 = 4;

/// Outcome of compressing one block: either its raw bytes (not worth
/// Huffman-coding) or a self-contained Huffman-coded payload.
pub enum BlockEncoding {
    /// Emit the block's bytes verbatim.
    Stored,
    /// Emit this byte-aligned Huffman-coded payload.
    Huffman(Vec<u8>),
}

/// The number of used entries at the front of a length vector: one past the
/// highest index with a nonzero length, never below `min_count`.
fn trimmed_count(lengths: &[u8], min_count: usize) -> usize {
    let used = lengths
        .iter()
        .rposition(|&l| l != 0)
        .map(|i| i + 1)
        .unwrap_or(min_count);
    used.max(min_count)
}

fn estimate_bits(tokens: &[LzToken], ll_lengths: &[u8], dist_lengths: &[u8]) -> u64 {
    let mut bits = 0u64;
    for token in tokens {
        match *token {
            LzToken::Literal(b) => bits += ll_lengths[b as usize] as u64,
            LzToken::Match { length, distance } => {
                let (lcode, lextra, _) = length_to_code(length);
                bits += ll_lengths[lcode as usize] as u64 + lextra as u64;
                let (dcode, dextra, _) = distance_to_code(distance);
                bits += dist_lengths[dcode as usize] as u64 + dextra as u64;
            }
        }
    }
    bits + ll_lengths[END_OF_BLOCK as usize] as u64
}

/// Compress one block's worth of data.
///
/// `lz` is the caller's reusable match finder; its hash state is reset for
/// this block (no cross-block back-references).
pub fn compress_block(data: &[u8], lz: &mut LzEncoder) -> Result<BlockEncoding> {
    let tokens = lz.compress(data);

    let mut ll_builder = HuffmanBuilder::new(LITLEN_ALPHABET_SIZE, MAX_CODE_LENGTH as u8);
    let mut dist_builder = HuffmanBuilder::new(DISTANCE_ALPHABET_SIZE, MAX_CODE_LENGTH as u8);

    for token in &tokens {
        match *token {
            LzToken::Literal(b) => ll_builder.add(b as u16),
            LzToken::Match { length, distance } => {
                let (lcode, _, _) = length_to_code(length);
                ll_builder.add(lcode);
                let (dcode, _, _) = distance_to_code(distance);
                dist_builder.add(dcode);
            }
        }
    }
    ll_builder.add(END_OF_BLOCK);

    let ll_lengths = ll_builder.build_lengths();
    let dist_lengths = dist_builder.build_lengths();

    let n_ll = trimmed_count(&ll_lengths, END_OF_BLOCK as usize + 1);
    let n_dist = trimmed_count(&dist_lengths, 1);

    let tree_bits = NLL_BITS as u64
        + NDIST_BITS as u64
        + (n_ll as u64 + n_dist as u64) * LEN_FIELD_BITS as u64;
    let estimated_bytes = (estimate_bits(&tokens, &ll_lengths, &dist_lengths) + tree_bits).div_ceil(8);

    if estimated_bytes >= data.len() as u64 {
        return Ok(BlockEncoding::Stored);
    }

    let ll_encoder = HuffmanEncoder::from_code_lengths(&ll_lengths)?;
    let dist_encoder = HuffmanEncoder::from_code_lengths(&dist_lengths)?;

    let mut payload = Vec::new();
    {
        let mut writer = BitWriter::new(&mut payload);
        writer.write_bits(n_ll as u32, NLL_BITS)?;
        writer.write_bits(n_dist as u32, NDIST_BITS)?;
        for &len in &ll_lengths[..n_ll] {
            writer.write_bits(len as u32, LEN_FIELD_BITS)?;
        }
        for &len in &dist_lengths[..n_dist] {
            writer.write_bits(len as u32, LEN_FIELD_BITS)?;
        }

        for token in &tokens {
            match *token {
                LzToken::Literal(b) => ll_encoder.write(&mut writer, b as u16)?,
                LzToken::Match { length, distance } => {
                    let (lcode, lextra_bits, lextra_val) = length_to_code(length);
                    ll_encoder.write(&mut writer, lcode)?;
                    if lextra_bits > 0 {
                        writer.write_bits(lextra_val as u32, lextra_bits)?;
                    }
                    let (dcode, dextra_bits, dextra_val) = distance_to_code(distance);
                    dist_encoder.write(&mut writer, dcode)?;
                    if dextra_bits > 0 {
                        writer.write_bits(dextra_val as u32, dextra_bits)?;
                    }
                }
            }
        }
        ll_encoder.write(&mut writer, END_OF_BLOCK)?;
        writer.flush()?;
    }

    Ok(BlockEncoding::Huffman(payload))
}

/// Copy a match of `length` bytes from `out[src..]` to the end of `out`,
/// preserving overlap semantics (a match may reference bytes written earlier
/// in the same copy, which is how runs are represented compactly).
fn copy_match(out: &mut Vec<u8>, src: usize, distance: usize, length: usize) {
    if distance >= length {
        out.extend_from_within(src..src + length);
        return;
    }
    if distance == 1 {
        let b = out[src];
        out.resize(out.len() + length, b);
        return;
    }
    let mut remaining = length;
    let mut cursor = src;
    while remaining >= distance {
        out.extend_from_within(cursor..cursor + distance);
        cursor += distance;
        remaining -= distance;
    }
    if remaining > 0 {
        out.extend_from_within(cursor..cursor + remaining);
    }
}

/// Decompress one Huffman-coded block's payload into `out`.
///
/// `ll_table`/`dist_table` are the caller's reusable decode tables, rebuilt
/// in place from this block's transmitted trees.
pub fn decompress_block(
    payload: &[u8],
    raw_size: usize,
    ll_table: &mut HuffmanTable,
    dist_table: &mut HuffmanTable,
    out: &mut Vec<u8>,
) -> Result<()> {
    let mut reader = BitReader::new(Cursor::new(payload));

    let n_ll = reader.read_bits(NLL_BITS) as usize;
    let n_dist = reader.read_bits(NDIST_BITS) as usize;

    if !(END_OF_BLOCK as usize + 1..=LITLEN_ALPHABET_SIZE).contains(&n_ll) {
        return Err(OdzError::corrupt("block", "literal/length tree count out of range"));
    }
    if !(1..=DISTANCE_ALPHABET_SIZE).contains(&n_dist) {
        return Err(OdzError::corrupt("block", "distance tree count out of range"));
    }

    let mut ll_lengths = vec![0u8; LITLEN_ALPHABET_SIZE];
    for len in ll_lengths.iter_mut().take(n_ll) {
        *len = reader.read_bits(LEN_FIELD_BITS) as u8;
    }
    let mut dist_lengths = vec![0u8; DISTANCE_ALPHABET_SIZE];
    for len in dist_lengths.iter_mut().take(n_dist) {
        *len = reader.read_bits(LEN_FIELD_BITS) as u8;
    }

    ll_table.rebuild(&ll_lengths)?;
    dist_table.rebuild(&dist_lengths)?;

    let base = out.len();
    loop {
        let sym = ll_table.decode(&mut reader)?;

        if sym < 256 {
            if out.len() - base >= raw_size {
                return Err(OdzError::corrupt("block", "literal overruns declared raw size"));
            }
            out.push(sym as u8);
            continue;
        }
        if sym == END_OF_BLOCK {
            break;
        }

        let code_idx = (sym - 257) as usize;
        if code_idx >= LENGTH_EXTRA_BITS.len() {
            return Err(OdzError::corrupt("block", "invalid length code"));
        }
        let extra_bits = LENGTH_EXTRA_BITS[code_idx];
        let extra = if extra_bits > 0 {
            reader.read_bits(extra_bits) as u16
        } else {
            0
        };
        let length = decode_length(sym, extra) as usize;

        let dcode = dist_table.decode(&mut reader)?;
        if dcode as usize >= DISTANCE_EXTRA_BITS.len() {
            return Err(OdzError::corrupt("block", "invalid distance code"));
        }
        let dextra_bits = DISTANCE_EXTRA_BITS[dcode as usize];
        let dextra = if dextra_bits > 0 {
            reader.read_bits(dextra_bits) as u16
        } else {
            0
        };
        let distance = decode_distance(dcode, dextra) as usize;

        let op = out.len() - base;
        if distance == 0 || distance > op {
            return Err(OdzError::corrupt("block", "distance exceeds output position"));
        }
        if op + length > raw_size {
            return Err(OdzError::corrupt("block", "match overruns declared raw size"));
        }
        let src = out.len() - distance;
        copy_match(out, src, distance, length);
    }

    if out.len() - base != raw_size {
        return Err(OdzError::corrupt("block", "decoded size does not match declared raw size"));
    }
    Ok(())
}
