//! LZ77 match finding.
//!
//! Unlike a streaming DEFLATE encoder, this operates over one block's data
//! already sitting in memory: there is no sliding window to maintain, no
//! dictionary preload, and hash chains are rebuilt from scratch for every
//! block. The only windowing concept that survives is the maximum match
//! distance, since that is part of the wire format (the distance alphabet
//! tops out at 32768).
//!
//! # Algorithm
//!
//! For each position, a hash of the next 3 bytes indexes a chain of earlier
//! positions sharing that hash. The chain is walked (bounded by
//! `max_chain`), and the longest match found is either emitted directly or,
//! with lazy matching enabled, deferred by one byte if the next position
//! yields a strictly longer match.

/// Maximum match distance (also the distance alphabet's upper bound).
pub const WINDOW_SIZE: usize = 32768;

/// Minimum match length accepted by the format.
pub const MIN_MATCH: usize = 3;

/// Maximum match length (also the length alphabet's upper bound).
pub const MAX_MATCH: usize = 258;

/// Size of the hash table (power of 2).
const HASH_SIZE: usize = 32768;

/// Hash mask.
const HASH_MASK: usize = HASH_SIZE - 1;

/// Chain-walk bound for the default compression level.
const DEFAULT_MAX_CHAIN: usize = 128;

/// Sentinel for "no earlier position with this hash".
const NONE: u32 = u32::MAX;

/// A token produced by LZ77 match finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzToken {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data within the same block.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the block (1-32768).
        distance: u16,
    },
}

/// LZ77 match finder, reused block-to-block.
///
/// Hash table and chain buffers are kept allocated across calls to
/// [`LzEncoder::compress`]; each call resets them rather than reallocating.
#[derive(Debug)]
pub struct LzEncoder {
    hash_table: Vec<u32>,
    hash_chain: Vec<u32>,
    max_chain: usize,
    lazy_match: bool,
}

impl LzEncoder {
    /// Create a new match finder with default settings (level 6).
    pub fn new() -> Self {
        Self::with_level(6)
    }

    /// Create a new match finder at the given compression level (0-9).
    ///
    /// Level only affects how hard the finder searches (`max_chain`) and
    /// whether it uses lazy matching; it does not change `MIN_MATCH`, which
    /// is fixed by the wire format.
    pub fn with_level(level: u8) -> Self {
        let level = level.min(9);

        let (max_chain, lazy_match) = match level {
            0 => (0, false), // store only: caller should skip LZ altogether
            1 => (4, false),
            2 => (8, false),
            3 => (16, false),
            4 => (32, false),
            5 => (64, true),
            6 => (DEFAULT_MAX_CHAIN, true),
            7 => (256, true),
            8 => (1024, true),
            9 => (4096, true),
            _ => unreachable!(),
        };

        Self {
            hash_table: vec![NONE; HASH_SIZE],
            hash_chain: Vec::new(),
            max_chain,
            lazy_match,
        }
    }

    /// Compute hash for 3 bytes.
    #[inline(always)]
    fn hash(b0: u8, b1: u8, b2: u8) -> usize {
        let h = ((b0 as usize).wrapping_mul(506832829))
            ^ ((b1 as usize).wrapping_mul(2654435761) << 8)
            ^ ((b2 as usize).wrapping_mul(374761393) << 16);
        (h ^ (h >> 15)) & HASH_MASK
    }

    /// Record `pos` in the hash chain for the 3 bytes starting there.
    fn update_hash(&mut self, data: &[u8], pos: usize) {
        if pos + MIN_MATCH <= data.len() {
            let h = Self::hash(data[pos], data[pos + 1], data[pos + 2]);
            self.hash_chain[pos] = self.hash_table[h];
            self.hash_table[h] = pos as u32;
        }
    }

    /// Find the longest match at `pos`, searching at most `max_len` bytes ahead.
    fn find_match(&self, data: &[u8], pos: usize, max_len: usize) -> Option<(u16, u16)> {
        if pos + MIN_MATCH > data.len() || max_len < MIN_MATCH {
            return None;
        }

        let h = Self::hash(data[pos], data[pos + 1], data[pos + 2]);

        let mut match_pos = self.hash_table[h];
        let mut best_len = MIN_MATCH - 1;
        let mut best_dist = 0usize;

        let min_pos = pos.saturating_sub(WINDOW_SIZE);
        let mut chain_len = 0;
        let max_check = max_len.min(MAX_MATCH);

        while match_pos != NONE
            && (match_pos as usize) >= min_pos
            && (match_pos as usize) < pos
            && chain_len < self.max_chain
        {
            let mp = match_pos as usize;
            let dist = pos - mp;

            if dist <= WINDOW_SIZE
                && data[mp + best_len] == data[pos + best_len]
                && data[mp] == data[pos]
            {
                let mut len = 1;
                while len < max_check && data[mp + len] == data[pos + len] {
                    len += 1;
                }

                if len > best_len {
                    best_len = len;
                    best_dist = dist;

                    if len >= max_len || len >= MAX_MATCH {
                        break;
                    }
                }
            }

            match_pos = self.hash_chain[mp];
            chain_len += 1;
        }

        if best_len >= MIN_MATCH {
            Some((best_len as u16, best_dist as u16))
        } else {
            None
        }
    }

    /// Find LZ77 tokens for one block's worth of data.
    ///
    /// Resets hash state before scanning; matches never reference data
    /// outside `data` (no cross-block references, no dictionary).
    pub fn compress(&mut self, data: &[u8]) -> Vec<LzToken> {
        self.hash_table.fill(NONE);
        if self.hash_chain.len() < data.len() {
            self.hash_chain.resize(data.len(), NONE);
        }

        let mut tokens = Vec::with_capacity(data.len() / 2 + 1);
        let mut pos = 0;

        while pos < data.len() {
            let remaining = data.len() - pos;
            let match_result = self.find_match(data, pos, remaining);

            if let Some((length, distance)) = match_result {
                if self.lazy_match && pos + 1 < data.len() {
                    // update_hash(pos) happens exactly once on this path, here.
                    self.update_hash(data, pos);
                    let lookahead = self.find_match(data, pos + 1, remaining - 1);
                    let defer = matches!(lookahead, Some((next_len, _)) if next_len > length + 1);

                    if !defer {
                        tokens.push(LzToken::Match { length, distance });
                        for i in 1..length as usize {
                            self.update_hash(data, pos + i);
                        }
                        pos += length as usize;
                        continue;
                    }

                    // Lazily rejected: pos is already hashed above, just emit the literal.
                    tokens.push(LzToken::Literal(data[pos]));
                    pos += 1;
                    continue;
                }

                tokens.push(LzToken::Match { length, distance });
                for i in 0..length as usize {
                    self.update_hash(data, pos + i);
                }
                pos += length as usize;
                continue;
            }

            tokens.push(LzToken::Literal(data[pos]));
            self.update_hash(data, pos);
            pos += 1;
        }

        tokens
    }

    /// Find LZ77 tokens for one block (convenience, one-shot).
    pub fn compress_once(data: &[u8], level: u8) -> Vec<LzToken> {
        let mut encoder = Self::with_level(level);
        encoder.compress(data)
    }
}

impl Default for LzEncoder {
    fn default() -> Self {
        Self::new()
    }
}
