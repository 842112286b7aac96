//! Command-line interface argument parsing
//!
//! This module defines all command-line arguments and subcommands for the
//! scan-and-analyze engine's CLI driver using clap's derive macros.

use clap::{Parser, Subcommand};

use crate::error::{Error, Result};
use crate::report::OutputFormat;

/// A concurrent directory scanner, duplicate/near-duplicate detector, and
/// snapshot/diff tool.
#[derive(Parser, Debug, Clone)]
#[command(name = "scanengine")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Suppress per-file progress output during a scan
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan a directory tree and report file/byte counts
    Scan(ScanArgs),

    /// Scan a directory tree and report duplicate/near-duplicate files
    Duplicates(ScanArgs),

    /// Snapshot subcommands: create a snapshot or diff two of them
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SnapshotAction {
    /// Scan a directory and write a snapshot file
    Create {
        #[command(flatten)]
        scan: ScanArgs,

        /// Path to write the resulting snapshot JSON to
        #[arg(long)]
        out: String,

        /// Optional human-readable label
        #[arg(long)]
        label: Option<String>,
    },

    /// Diff two previously created snapshot files
    Diff {
        /// Path to the earlier snapshot JSON
        from: String,
        /// Path to the later snapshot JSON
        to: String,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    /// The directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: String,

    /// Number of worker threads (0 = auto)
    #[arg(long, default_value = "0", value_name = "N")]
    pub workers: usize,

    /// Bounded queue capacity between the walker and the worker pool
    #[arg(long, default_value = "10000", value_name = "N")]
    pub queue_size: usize,

    /// Additional exclusion tokens, on top of the built-in defaults
    #[arg(long, value_name = "TOKEN")]
    pub exclude: Vec<String>,

    /// Glob patterns excluded by file name (e.g. `*.tmp`)
    #[arg(long, value_name = "GLOB")]
    pub exclude_glob: Vec<String>,

    /// Maximum depth to traverse
    #[arg(short = 'L', long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Minimum file size to include (e.g. 1MB, 500KB)
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<String>,

    /// Maximum file size to include (e.g. 10MB, 1GB)
    #[arg(long, value_name = "SIZE")]
    pub max_size: Option<String>,

    /// Skip computing SHA-256 content hashes
    #[arg(long)]
    pub no_content_hash: bool,

    /// Compute perceptual hashes for image files
    #[arg(long)]
    pub perceptual_hash: bool,

    /// Hamming distance threshold for near-duplicate clustering
    #[arg(long, default_value = "10", value_name = "N")]
    pub perceptual_threshold: u32,

    /// Extract best-effort properties (image dimensions, utf8 validity)
    #[arg(long)]
    pub properties: bool,

    /// Skip exact duplicate detection (duplicates subcommand only)
    #[arg(long)]
    pub no_exact: bool,

    /// Skip near-duplicate detection (duplicates subcommand only)
    #[arg(long)]
    pub no_near: bool,
}

/// Parse a human-readable size string (e.g., "1MB", "500KB") into bytes.
pub fn parse_size(size_str: &str) -> Result<u64> {
    let size_str = size_str.trim().to_uppercase();

    let (num_str, unit) = if let Some(pos) = size_str.find(|c: char| c.is_alphabetic()) {
        size_str.split_at(pos)
    } else {
        (size_str.as_str(), "")
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| Error::size_parse(format!("Invalid number: {}", num_str)))?;

    let bytes = match unit.trim() {
        "" | "B" => num,
        "K" | "KB" => num * 1024.0,
        "M" | "MB" => num * 1024.0 * 1024.0,
        "G" | "GB" => num * 1024.0 * 1024.0 * 1024.0,
        "T" | "TB" => num * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return Err(Error::size_parse(format!("Unknown size unit: {}", unit))),
    };

    Ok(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_handles_plain_bytes() {
        assert_eq!(parse_size("512").unwrap(), 512);
    }

    #[test]
    fn parse_size_handles_units() {
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("2MB").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
    }

    #[test]
    fn parse_size_rejects_unknown_unit() {
        assert!(parse_size("5XB").is_err());
    }

    #[test]
    fn parse_size_rejects_garbage_number() {
        assert!(parse_size("abcKB").is_err());
    }
}
