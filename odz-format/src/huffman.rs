//! Canonical Huffman coding: code-length assignment, canonical code
//! derivation, and a two-level decode table.
//!
//! # Alphabets
//!
//! ODZ blocks use two Huffman alphabets: literal/length (0-285, see
//! [`crate::tables`]) and distance (0-29).
//!
//! # Two-level decode table
//!
//! Codes up to `PRIMARY_BITS` long are resolved with a single array lookup.
//! Longer codes redirect through a secondary arena keyed by their shared
//! `PRIMARY_BITS`-bit prefix; since canonical Huffman codes are prefix-free, a
//! short code's bit pattern can never collide with a long code's prefix, so
//! the two fills never conflict.

use odz_core::bitstream::{BitReader, BitWriter};
use odz_core::error::{OdzError, Result};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::io::{Read, Write};

/// Maximum Huffman code length this codec will produce or accept.
pub const MAX_CODE_LENGTH: usize = 15;

/// Number of bits resolved by a single primary-table lookup.
pub const PRIMARY_BITS: u8 = 9;

/// Size of the primary lookup table (`2^PRIMARY_BITS`).
pub const PRIMARY_SIZE: usize = 1 << PRIMARY_BITS;

#[derive(Debug, Clone, Copy, Default)]
struct SecondaryEntry {
    len: u8,
    sym: u16,
}

#[derive(Debug, Clone, Copy)]
struct PrimaryEntry {
    len: u8,
    sym: u16,
    redirect: bool,
    total_bits: u8,
    offset: u32,
}

impl Default for PrimaryEntry {
    fn default() -> Self {
        Self {
            len: 0,
            sym: 0,
            redirect: false,
            total_bits: 0,
            offset: 0,
        }
    }
}

/// Reverse the low `len` bits of `code`.
///
/// Canonical codes are derived MSB-first; the bitstream is LSB-first, so a
/// code must be bit-reversed before it can be compared against bits peeked
/// from the stream.
fn reverse_bits(code: u32, len: u8) -> u32 {
    let mut reversed = 0u32;
    let mut c = code;
    for _ in 0..len {
        reversed = (reversed << 1) | (c & 1);
        c >>= 1;
    }
    reversed
}

/// Derive the canonical, stream-order (LSB-first) code for every symbol with
/// a nonzero length.
///
/// Returns a vector parallel to `lengths`; entries for unused symbols are 0
/// and must not be written to the stream.
fn canonical_stream_codes(lengths: &[u8]) -> Result<Vec<u32>> {
    let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
    for &len in lengths {
        if len == 0 {
            continue;
        }
        if len as usize > MAX_CODE_LENGTH {
            return Err(OdzError::format(format!(
                "code length {} exceeds maximum {}",
                len, MAX_CODE_LENGTH
            )));
        }
        bl_count[len as usize] += 1;
    }

    let mut next_code = [0u32; MAX_CODE_LENGTH + 2];
    let mut code = 0u32;
    for bits in 1..=MAX_CODE_LENGTH {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }
    // Kraft check: the final running code plus the count at the longest used
    // length must not exceed the code space at that length.
    if code + bl_count[MAX_CODE_LENGTH] > 1u32 << MAX_CODE_LENGTH {
        return Err(OdzError::corrupt("huffman", "over-subscribed code lengths"));
    }

    let mut assign = next_code;
    let mut codes = vec![0u32; lengths.len()];
    for (sym, &len) in lengths.iter().enumerate() {
        if len == 0 {
            continue;
        }
        let len = len as usize;
        codes[sym] = reverse_bits(assign[len], len as u8);
        assign[len] += 1;
    }

    Ok(codes)
}

/// A two-level canonical Huffman decode table.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    primary: Vec<PrimaryEntry>,
    secondary: Vec<SecondaryEntry>,
    max_code_length: u8,
}

impl HuffmanTable {
    /// Create an empty table with its primary array pre-allocated.
    ///
    /// Use [`HuffmanTable::rebuild`] to fill it; this lets a decoder reuse one
    /// table (and its secondary arena's backing storage) across every block
    /// of an alphabet instead of allocating fresh per block.
    pub fn new_empty() -> Self {
        Self {
            primary: vec![PrimaryEntry::default(); PRIMARY_SIZE],
            secondary: Vec::new(),
            max_code_length: 0,
        }
    }

    /// Build a decode table from a code-length vector.
    ///
    /// `lengths[sym]` is the bit length of `sym`'s code, 0 if unused.
    pub fn from_code_lengths(lengths: &[u8]) -> Result<Self> {
        let mut table = Self::new_empty();
        table.rebuild(lengths)?;
        Ok(table)
    }

    /// Rebuild this table in place for a new code-length vector.
    ///
    /// The primary array (fixed size) is overwritten slot by slot rather than
    /// reallocated; the secondary arena is cleared and refilled, reusing its
    /// existing capacity when possible.
    pub fn rebuild(&mut self, lengths: &[u8]) -> Result<()> {
        let codes = canonical_stream_codes(lengths)?;
        let max_code_length = lengths.iter().copied().max().unwrap_or(0);
        if max_code_length == 0 {
            return Err(OdzError::corrupt("huffman", "no symbols in code length vector"));
        }

        for entry in self.primary.iter_mut() {
            *entry = PrimaryEntry::default();
        }
        self.secondary.clear();

        let mut groups: HashMap<u32, Vec<(u16, u8, u32)>> = HashMap::new();

        for (sym, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let stream_code = codes[sym];
            if len <= PRIMARY_BITS {
                let fill = 1usize << (PRIMARY_BITS - len);
                for i in 0..fill {
                    let idx = (stream_code as usize) | (i << len);
                    self.primary[idx] = PrimaryEntry {
                        len,
                        sym: sym as u16,
                        redirect: false,
                        total_bits: 0,
                        offset: 0,
                    };
                }
            } else {
                let prefix = stream_code & ((1 << PRIMARY_BITS) - 1);
                groups.entry(prefix).or_default().push((sym as u16, len, stream_code));
            }
        }

        for (prefix, entries) in groups {
            let maxlen = entries.iter().map(|&(_, l, _)| l).max().unwrap();
            let sub_size = 1usize << (maxlen - PRIMARY_BITS);
            let offset = self.secondary.len();
            self.secondary
                .try_reserve(sub_size)
                .map_err(|_| OdzError::oom(sub_size))?;
            self.secondary.resize(offset + sub_size, SecondaryEntry::default());

            for (sym, len, stream_code) in entries {
                let remaining = (stream_code >> PRIMARY_BITS) as usize;
                let rem_bits = len - PRIMARY_BITS;
                let fill = 1usize << (maxlen - len);
                for k in 0..fill {
                    let idx = remaining | (k << rem_bits);
                    self.secondary[offset + idx] = SecondaryEntry { len, sym };
                }
            }

            self.primary[prefix as usize] = PrimaryEntry {
                len: 0,
                sym: 0,
                redirect: true,
                total_bits: maxlen,
                offset: offset as u32,
            };
        }

        self.max_code_length = max_code_length;
        Ok(())
    }

    /// Decode a single symbol from the bit stream.
    #[inline]
    pub fn decode<R: Read>(&self, reader: &mut BitReader<R>) -> Result<u16> {
        let bits = reader.peek_bits(PRIMARY_BITS);
        let e = self.primary[bits as usize];

        if !e.redirect {
            if e.len == 0 {
                return Err(OdzError::corrupt("huffman", "invalid code at primary table"));
            }
            reader.skip_bits(e.len);
            return Ok(e.sym);
        }

        let total = e.total_bits;
        let wide = reader.peek_bits(total);
        let mask = (1u32 << (total - PRIMARY_BITS)) - 1;
        let sub_idx = e.offset as usize + (((wide >> PRIMARY_BITS) & mask) as usize);
        let se = self.secondary[sub_idx];
        if se.len == 0 {
            return Err(OdzError::corrupt("huffman", "invalid code at secondary table"));
        }
        reader.skip_bits(se.len);
        Ok(se.sym)
    }

    /// Maximum code length present in this table.
    pub fn max_code_length(&self) -> u8 {
        self.max_code_length
    }
}

impl Default for HuffmanTable {
    fn default() -> Self {
        Self::new_empty()
    }
}

/// Writes symbols using a canonical code-length vector.
///
/// Unlike [`HuffmanTable`], the encode side needs only the per-symbol
/// `(code, length)` pairs, not a lookup table.
#[derive(Debug, Clone)]
pub struct HuffmanEncoder {
    codes: Vec<u32>,
    lengths: Vec<u8>,
}

impl HuffmanEncoder {
    /// Build an encoder from a code-length vector.
    pub fn from_code_lengths(lengths: &[u8]) -> Result<Self> {
        let codes = canonical_stream_codes(lengths)?;
        Ok(Self {
            codes,
            lengths: lengths.to_vec(),
        })
    }

    /// Write one symbol's code to the stream.
    pub fn write<W: Write>(&self, writer: &mut BitWriter<W>, symbol: u16) -> Result<()> {
        let sym = symbol as usize;
        writer.write_bits(self.codes[sym], self.lengths[sym])
    }

    /// Bit cost of writing `symbol`.
    pub fn bit_length(&self, symbol: u16) -> u8 {
        self.lengths[symbol as usize]
    }
}

/// Builds code-length vectors from symbol frequencies.
#[derive(Debug)]
pub struct HuffmanBuilder {
    frequencies: Vec<u32>,
    max_length: u8,
}

impl HuffmanBuilder {
    /// Create a new builder over an alphabet of `alphabet_size` symbols.
    pub fn new(alphabet_size: usize, max_length: u8) -> Self {
        Self {
            frequencies: vec![0; alphabet_size],
            max_length,
        }
    }

    /// Record one occurrence of `symbol`.
    pub fn add(&mut self, symbol: u16) {
        self.add_count(symbol, 1);
    }

    /// Record `count` occurrences of `symbol`.
    pub fn add_count(&mut self, symbol: u16, count: u32) {
        if (symbol as usize) < self.frequencies.len() {
            self.frequencies[symbol as usize] += count;
        }
    }

    /// Frequency currently recorded for `symbol`.
    pub fn frequency(&self, symbol: u16) -> u32 {
        self.frequencies.get(symbol as usize).copied().unwrap_or(0)
    }

    /// Build a code-length vector for the recorded frequencies.
    ///
    /// A frequency-0 alphabet gets an arbitrary symbol (index 0) assigned
    /// length 1 so a valid decode table can still be built, even though it is
    /// never invoked. A single used symbol gets length 1 with no phantom
    /// partner, since the Kraft equality requirement only applies once two or
    /// more symbols are present.
    pub fn build_lengths(&self) -> Vec<u8> {
        let n = self.frequencies.len();
        let mut lengths = vec![0u8; n];

        let used: Vec<(u32, usize)> = self
            .frequencies
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f > 0)
            .map(|(i, &f)| (f, i))
            .collect();

        if used.is_empty() {
            lengths[0] = 1;
            return lengths;
        }
        if used.len() == 1 {
            lengths[used[0].1] = 1;
            return lengths;
        }

        let depths = Self::huffman_tree_depths(&used);
        let max_len = self.max_length as usize;
        let max_depth = *depths.iter().max().unwrap() as usize;

        let final_lengths: Vec<u8> = if max_depth <= max_len {
            depths.iter().map(|&d| d as u8).collect()
        } else {
            let mut bl_count = vec![0u32; max_depth + 1];
            for &d in &depths {
                bl_count[d as usize] += 1;
            }
            Self::limit_lengths(&mut bl_count, max_len);

            let mut order: Vec<usize> = (0..used.len()).collect();
            order.sort_by_key(|&i| (depths[i], used[i].1));

            let mut lens = vec![0u8; used.len()];
            let mut cursor = 0usize;
            for l in 1..=max_len {
                for _ in 0..bl_count[l] {
                    lens[order[cursor]] = l as u8;
                    cursor += 1;
                }
            }
            lens
        };

        for (&(_, sym), &len) in used.iter().zip(final_lengths.iter()) {
            lengths[sym] = len;
        }
        lengths
    }

    /// Build a real Huffman tree (binary heap merge of the two lightest
    /// nodes) and return each used symbol's leaf depth, in `used` order.
    fn huffman_tree_depths(used: &[(u32, usize)]) -> Vec<u32> {
        struct Node {
            left: Option<usize>,
            right: Option<usize>,
            leaf: Option<usize>,
        }

        let mut arena: Vec<Node> = used
            .iter()
            .map(|_| Node {
                left: None,
                right: None,
                leaf: None,
            })
            .collect();
        for (i, node) in arena.iter_mut().enumerate() {
            node.leaf = Some(i);
        }

        // (weight, insertion order, arena index); insertion order breaks ties
        // deterministically so merges don't depend on heap implementation details.
        let mut heap: BinaryHeap<Reverse<(u64, u64, usize)>> = BinaryHeap::new();
        for (i, &(freq, _)) in used.iter().enumerate() {
            heap.push(Reverse((freq as u64, i as u64, i)));
        }
        let mut seq = used.len() as u64;

        while heap.len() > 1 {
            let Reverse((w1, _, i1)) = heap.pop().unwrap();
            let Reverse((w2, _, i2)) = heap.pop().unwrap();
            let new_idx = arena.len();
            arena.push(Node {
                left: Some(i1),
                right: Some(i2),
                leaf: None,
            });
            heap.push(Reverse((w1 + w2, seq, new_idx)));
            seq += 1;
        }

        let Reverse((_, _, root)) = heap.pop().unwrap();

        let mut depths = vec![0u32; used.len()];
        let mut stack = vec![(root, 0u32)];
        while let Some((idx, depth)) = stack.pop() {
            let node = &arena[idx];
            if let Some(leaf) = node.leaf {
                depths[leaf] = depth;
            } else {
                if let Some(l) = node.left {
                    stack.push((l, depth + 1));
                }
                if let Some(r) = node.right {
                    stack.push((r, depth + 1));
                }
            }
        }
        depths
    }

    /// zlib-style length limiting: redistributes codes longer than `max_len`
    /// down into shorter buckets while preserving the Kraft sum exactly.
    fn limit_lengths(bl_count: &mut [u32], max_len: usize) {
        if bl_count.len() <= max_len + 1 {
            return;
        }
        for i in (max_len + 1..bl_count.len()).rev() {
            while bl_count[i] > 0 {
                let mut j = i - 2;
                while bl_count[j] == 0 {
                    j -= 1;
                }
                bl_count[i] -= 2;
                bl_count[i - 1] += 1;
                bl_count[j + 1] += 2;
                bl_count[j] -= 1;
            }
        }
    }
}
