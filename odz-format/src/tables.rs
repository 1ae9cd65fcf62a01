//! LZ token alphabet tables.
//!
//! ODZ reuses DEFLATE's length/distance base-and-extra-bits tables (RFC 1951
//! Section 3.2.5) for its literal/length and distance alphabets, giving a
//! 286-symbol literal/length alphabet (0-255 literals, 256 end-of-block,
//! 257-285 length codes) and a 30-symbol distance alphabet.

/// Maximum code length in either alphabet.
pub const MAX_CODE_LENGTH: usize = 15;

/// Size of the literal/length alphabet (0-285).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet (0-29).
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// End-of-block symbol in the literal/length alphabet.
pub const END_OF_BLOCK: u16 = 256;

/// Length code base values for length codes 257-285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits (special case)
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance code base values for distance codes 0-29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, // 0-3: 0 extra bits
    5, 7, // 4-5: 1 extra bit
    9, 13, // 6-7: 2 extra bits
    17, 25, // 8-9: 3 extra bits
    33, 49, // 10-11: 4 extra bits
    65, 97, // 12-13: 5 extra bits
    129, 193, // 14-15: 6 extra bits
    257, 385, // 16-17: 7 extra bits
    513, 769, // 18-19: 8 extra bits
    1025, 1537, // 20-21: 9 extra bits
    2049, 3073, // 22-23: 10 extra bits
    4097, 6145, // 24-25: 11 extra bits
    8193, 12289, // 26-27: 12 extra bits
    16385, 24577, // 28-29: 13 extra bits
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, // 0-3
    1, 1, // 4-5
    2, 2, // 6-7
    3, 3, // 8-9
    4, 4, // 10-11
    5, 5, // 12-13
    6, 6, // 14-15
    7, 7, // 16-17
    8, 8, // 18-19
    9, 9, // 20-21
    10, 10, // 22-23
    11, 11, // 24-25
    12, 12, // 26-27
    13, 13, // 28-29
];

/// Convert a match length (3-258) to a (length code, extra bits, extra value).
pub fn length_to_code(length: u16) -> (u16, u8, u16) {
    debug_assert!(
        (3..=258).contains(&length),
        "length out of range: {}",
        length
    );

    let length = length as usize;

    let code = match length {
        3..=10 => length - 3 + 257,
        11..=18 => (length - 11) / 2 + 265,
        19..=34 => (length - 19) / 4 + 269,
        35..=66 => (length - 35) / 8 + 273,
        67..=130 => (length - 67) / 16 + 277,
        131..=257 => (length - 131) / 32 + 281,
        258 => 285,
        _ => unreachable!(),
    };

    let base = LENGTH_BASE[code - 257] as usize;
    let extra_bits = LENGTH_EXTRA_BITS[code - 257];
    let extra_value = (length - base) as u16;

    (code as u16, extra_bits, extra_value)
}

/// Convert a match distance (1-32768) to a (distance code, extra bits, extra value).
pub fn distance_to_code(distance: u16) -> (u16, u8, u16) {
    debug_assert!(
        (1..=32768).contains(&distance),
        "distance out of range: {}",
        distance
    );

    let code = match distance {
        1 => 0,
        2 => 1,
        3 => 2,
        4 => 3,
        5..=6 => 4,
        7..=8 => 5,
        9..=12 => 6,
        13..=16 => 7,
        17..=24 => 8,
        25..=32 => 9,
        33..=48 => 10,
        49..=64 => 11,
        65..=96 => 12,
        97..=128 => 13,
        129..=192 => 14,
        193..=256 => 15,
        257..=384 => 16,
        385..=512 => 17,
        513..=768 => 18,
        769..=1024 => 19,
        1025..=1536 => 20,
        1537..=2048 => 21,
        2049..=3072 => 22,
        3073..=4096 => 23,
        4097..=6144 => 24,
        6145..=8192 => 25,
        8193..=12288 => 26,
        12289..=16384 => 27,
        16385..=24576 => 28,
        _ => 29, // 24577..=32768
    };

    let base = DISTANCE_BASE[code];
    let extra_bits = DISTANCE_EXTRA_BITS[code];
    let extra_value = distance - base;

    (code as u16, extra_bits, extra_value)
}

/// Decode a length from a length code (257-285) and its extra-bit value.
pub fn decode_length(code: u16, extra: u16) -> u16 {
    debug_assert!((257..=285).contains(&code), "invalid length code: {}", code);
    LENGTH_BASE[(code - 257) as usize] + extra
}

/// Decode a distance from a distance code (0-29) and its extra-bit value.
pub fn decode_distance(code: u16, extra: u16) -> u16 {
    debug_assert!(code < 30, "invalid distance code: {}", code);
    DISTANCE_BASE[code as usize] + extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_to_code_roundtrip() {
        for length in 3..=258 {
            let (code, _extra_bits, extra_value) = length_to_code(length);
            let decoded = decode_length(code, extra_value);
            assert_eq!(decoded, length, "roundtrip failed for length {}", length);
        }
    }

    #[test]
    fn test_distance_to_code_roundtrip() {
        for distance in 1..=32768u16 {
            let (code, _extra_bits, extra_value) = distance_to_code(distance);
            let decoded = decode_distance(code, extra_value);
            assert_eq!(decoded, distance, "roundtrip failed for distance {}", distance);
        }
    }

    #[test]
    fn test_specific_lengths() {
        assert_eq!(length_to_code(3), (257, 0, 0));
        assert_eq!(length_to_code(10), (264, 0, 0));
        assert_eq!(length_to_code(11), (265, 1, 0));
        assert_eq!(length_to_code(12), (265, 1, 1));
        assert_eq!(length_to_code(258), (285, 0, 0));
    }

    #[test]
    fn test_specific_distances() {
        assert_eq!(distance_to_code(1), (0, 0, 0));
        assert_eq!(distance_to_code(4), (3, 0, 0));
        assert_eq!(distance_to_code(5), (4, 1, 0));
        assert_eq!(distance_to_code(6), (4, 1, 1));
        assert_eq!(distance_to_code(32768), (29, 13, 8191));
    }
}
