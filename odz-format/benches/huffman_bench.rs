//! Benchmarks for canonical Huffman build and two-level decode throughput.

use odz_format::huffman::{HuffmanBuilder, HuffmanEncoder, HuffmanTable};

fn main() {
    println!("Huffman Codec Benchmarks");
    println!("========================\n");

    for &(name, symbol_count) in &[("litlen_like", 286usize), ("dist_like", 30)] {
        let lengths = build_skewed_lengths(symbol_count);

        let start = std::time::Instant::now();
        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();
        let build_elapsed = start.elapsed();

        let encoder = HuffmanEncoder::from_code_lengths(&lengths).unwrap();
        let symbols: Vec<u16> = (0..symbol_count as u16)
            .cycle()
            .take(1_000_000)
            .collect();

        let mut buf = Vec::new();
        {
            use odz_core::bitstream::BitWriter;
            let mut writer = BitWriter::new(&mut buf);
            for &sym in &symbols {
                if lengths[sym as usize] > 0 {
                    encoder.write(&mut writer, sym).unwrap();
                }
            }
            writer.flush().unwrap();
        }

        let start = std::time::Instant::now();
        let mut decoded = 0usize;
        {
            use odz_core::bitstream::BitReader;
            use std::io::Cursor;
            let mut reader = BitReader::new(Cursor::new(&buf));
            while decoded < symbols.len() {
                let _ = table.decode(&mut reader);
                decoded += 1;
            }
        }
        let decode_elapsed = start.elapsed();

        let decode_throughput = decoded as f64 / decode_elapsed.as_secs_f64() / 1_000_000.0;

        println!("Test: {} ({} symbols)", name, symbol_count);
        println!("  table build: {:8.2} µs", build_elapsed.as_micros());
        println!(
            "  decode:      {:8.2} Msym/s over {} symbols ({:7.2} ms)",
            decode_throughput,
            decoded,
            decode_elapsed.as_millis()
        );
        println!("  max code length: {}", table.max_code_length());
        println!();
    }
}

/// Fibonacci-weighted frequencies, the textbook Huffman worst case for code
/// length, so the benchmark exercises both primary and secondary lookups.
fn build_skewed_lengths(symbol_count: usize) -> Vec<u8> {
    let mut builder = HuffmanBuilder::new(symbol_count, 15);
    let mut a = 1u32;
    let mut b = 1u32;
    for sym in 0..symbol_count as u16 {
        builder.add_count(sym, a);
        let next = a + b;
        a = b;
        b = next;
    }
    builder.build_lengths()
}
