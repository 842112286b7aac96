//! scanengine - A concurrent filesystem scanner, duplicate/near-duplicate
//! detector, and snapshot/diff engine.
//!
//! # Features
//!
//! - **Concurrent scanning**: single-producer walker feeding a bounded
//!   worker pool, merged into one authoritative tree
//! - **Content + perceptual hashing**: SHA-256 for exact duplicates,
//!   perceptual hashing for visually similar images
//! - **Duplicate detection**: exact groups by content hash, near-duplicate
//!   groups by perceptual-hash proximity
//! - **Snapshots**: freeze a scan's file view and diff two of them for
//!   added/removed/modified/renamed entries
//! - **Configuration**: `~/.scanengine.toml` config file support
//! - **Cross-platform**: Linux, macOS, and Windows

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod hasher;
pub mod metadata;
pub mod report;
pub mod snapshot;
pub mod tree;
pub mod walker;
pub mod worker;

pub use cli::Args;
pub use config::Config;
pub use duplicates::{DetectOptions, DuplicateGroup, DuplicateReport};
pub use error::{Error, Result};
pub use metadata::{FileType, Metadata};
pub use snapshot::{Snapshot, SnapshotDiff};
pub use tree::{DirNode, FileNode, Tree};
pub use worker::{CancelHandle, ScanConfig, ScanProgress, ScanStats};

use std::path::Path;

/// Runs a full scan of `root` using `config`, returning the merged tree and
/// aggregate statistics. Thin convenience wrapper over [`worker::scan`] for
/// callers that don't need cancellation or progress reporting.
///
/// # Example
///
/// ```no_run
/// use scanengine::{scan, ScanConfig};
/// use std::path::Path;
///
/// let (tree, stats) = scan(Path::new("."), &ScanConfig::default()).unwrap();
/// println!("scanned {} files", tree.file_count());
/// ```
pub fn scan(root: &Path, config: &ScanConfig) -> Result<(Tree, ScanStats)> {
    worker::scan(root, config)
}

/// Runs duplicate/near-duplicate detection over every file in `tree`.
pub fn detect_duplicates(tree: &Tree, options: &DetectOptions) -> DuplicateReport {
    let files: Vec<FileNode> = tree.traverse().into_iter().cloned().collect();
    duplicates::detect(&files, options)
}
