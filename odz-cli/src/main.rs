//! odz - LZ77+Huffman compressor (ODZ format v2)
//!
//! Compresses or decompresses a single file. Mode, output path and
//! progress verbosity can be overridden; by default everything is
//! inferred from the input file's extension.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use odz_format::{compress, decompress, Options};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "odz")]
#[command(author, version, about = "LZ77+Huffman compressor (ODZ format v2)")]
#[command(long_about = "
odz compresses and decompresses the ODZ container format (LZ77 + canonical
Huffman, single stream, no archive metadata).

Mode is auto-detected from the input file's extension unless -c/-d is given:
  file.txt     -> compress   -> file.txt.odz
  file.txt.odz -> decompress -> file.txt

Examples:
  odz file.txt
  odz -d archive.odz
  odz -c -o out.odz file.txt
  odz c file.txt file.txt.odz
")]
struct Cli {
    /// Input file (\"c <input> <output>\" / \"d <input> <output>\" legacy form also accepted)
    input: String,

    /// Output file (optional second positional, overridden by -o/--out)
    output: Option<String>,

    /// Force compression, regardless of the input file's extension
    #[arg(short = 'c', conflicts_with = "decompress")]
    compress: bool,

    /// Force decompression, regardless of the input file's extension
    #[arg(short = 'd')]
    decompress: bool,

    /// Output file path
    #[arg(short = 'o', long = "out")]
    out: Option<String>,

    /// Overwrite the output file if it already exists
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Silent
    #[arg(long = "v0", conflicts_with_all = ["v1", "v2"])]
    v0: bool,

    /// Progress (default)
    #[arg(long = "v1", conflicts_with_all = ["v0", "v2"])]
    v1: bool,

    /// Verbose: progress + summary
    #[arg(long = "v2", conflicts_with_all = ["v0", "v1"])]
    v2: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Compress,
    Decompress,
}

fn ends_with_odz(path: &str) -> bool {
    path.len() >= 4 && path[path.len() - 4..].eq_ignore_ascii_case(".odz")
}

fn base_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

fn auto_output_path(input: &str, mode: Mode) -> String {
    let base = base_name(input);
    match mode {
        Mode::Compress => format!("{base}.odz"),
        Mode::Decompress => {
            if ends_with_odz(base) {
                base[..base.len() - 4].to_string()
            } else {
                format!("{base}.raw")
            }
        }
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();

    // Legacy "c <input> <output>" / "d <input> <output>" form: the first
    // positional is a literal "c" or "d" and the real input/output follow.
    let (mode_override, in_path, out_path_positional) =
        if (cli.input == "c" || cli.input == "d") && cli.output.is_some() {
            let legacy_mode = if cli.input == "c" { Mode::Compress } else { Mode::Decompress };
            (Some(legacy_mode), cli.output.clone().unwrap(), None)
        } else {
            (None, cli.input.clone(), cli.output.clone())
        };

    let mode = if cli.compress {
        Mode::Compress
    } else if cli.decompress {
        Mode::Decompress
    } else if let Some(m) = mode_override {
        m
    } else if ends_with_odz(&in_path) {
        Mode::Decompress
    } else {
        Mode::Compress
    };

    let verbosity = if cli.v0 { 0 } else if cli.v2 { 2 } else { 1 };

    let out_path = cli
        .out
        .or(out_path_positional)
        .unwrap_or_else(|| auto_output_path(&in_path, mode));

    if !cli.force && Path::new(&out_path).exists() {
        return Err(format!("'{out_path}' already exists (use -f to overwrite)"));
    }

    let input_file = File::open(&in_path).map_err(|_| "cannot open input file".to_string())?;
    let in_size = input_file.metadata().map(|m| m.len()).unwrap_or(0);
    let output_file =
        File::create(&out_path).map_err(|_| "cannot open output file".to_string())?;
    let mut writer = BufWriter::new(output_file);

    if verbosity >= 2 {
        let verb = if mode == Mode::Compress { "compress" } else { "decompress" };
        eprintln!("{verb} {in_path} -> {out_path}");
    }

    let bar = if verbosity >= 1 {
        let pb = ProgressBar::new(in_size.max(1));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%)")
                .expect("progress bar template is valid")
                .progress_chars("█▓▒░ "),
        );
        Some(pb)
    } else {
        None
    };

    let mut on_progress = |processed: u64, total: u64| -> bool {
        if let Some(pb) = &bar {
            if total > 0 {
                pb.set_length(total);
            }
            pb.set_position(processed);
        }
        true
    };
    let options = Options { progress: Some(&mut on_progress) };

    let result = match mode {
        Mode::Compress => compress(input_file, &mut writer, options),
        Mode::Decompress => decompress(input_file, &mut writer, options),
    };

    if let Some(pb) = &bar {
        pb.finish_and_clear();
    }

    if let Err(e) = result {
        drop(writer);
        let _ = std::fs::remove_file(&out_path);
        return Err(e.to_string());
    }

    if verbosity >= 2 {
        drop(writer);
        let out_size = std::fs::metadata(&out_path).map(|m| m.len()).unwrap_or(0);
        match mode {
            Mode::Compress => {
                let ratio = if in_size > 0 { 100.0 * out_size as f64 / in_size as f64 } else { 0.0 };
                eprintln!("  {in_size} -> {out_size} bytes ({ratio:.1}%)");
            }
            Mode::Decompress => eprintln!("  {in_size} -> {out_size} bytes"),
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = run() {
        eprintln!("odz: error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ends_with_odz() {
        assert!(ends_with_odz("file.txt.odz"));
        assert!(ends_with_odz("FILE.ODZ"));
        assert!(!ends_with_odz("file.txt"));
        assert!(!ends_with_odz("odz"));
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("a/b/c.txt"), "c.txt");
        assert_eq!(base_name("c.txt"), "c.txt");
    }

    #[test]
    fn test_auto_output_path_compress() {
        assert_eq!(auto_output_path("dir/file.txt", Mode::Compress), "file.txt.odz");
    }

    #[test]
    fn test_auto_output_path_decompress_odz_suffix() {
        assert_eq!(auto_output_path("dir/file.txt.odz", Mode::Decompress), "file.txt");
    }

    #[test]
    fn test_auto_output_path_decompress_no_odz_suffix() {
        assert_eq!(auto_output_path("dir/file.bin", Mode::Decompress), "file.bin.raw");
    }
}
