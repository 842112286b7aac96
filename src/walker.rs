//! The single-producer filesystem walker.
//!
//! Recursively enumerates directory entries under a root, applies exclusion
//! rules, and pushes candidate file paths into a bounded queue consumed by
//! the worker pool. Per-entry I/O failures are swallowed at the failing
//! entry and recorded against the scan's error sample; the walker never
//! aborts the overall walk because of one bad entry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::error::{Error, Result};
use crate::worker::ScanError;

/// Exclusion tokens checked against individual path components, plus simple
/// glob patterns checked against a file's final name component.
#[derive(Debug, Clone)]
pub struct WalkerOptions {
    pub exclusions: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub max_depth: Option<usize>,
    pub min_size: u64,
    pub max_size: Option<u64>,
}

impl Default for WalkerOptions {
    fn default() -> Self {
        WalkerOptions {
            exclusions: default_exclusions(),
            exclude_globs: Vec::new(),
            max_depth: None,
            min_size: 0,
            max_size: None,
        }
    }
}

/// The default exclusion token set per the scan-and-analyze engine's spec.
pub fn default_exclusions() -> Vec<String> {
    [
        ".git",
        ".svn",
        "__pycache__",
        "node_modules",
        ".venv",
        "venv",
        ".pytest_cache",
        ".ruff_cache",
        "dist",
        "build",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Single producer over a directory tree. `walk` pushes every passing file
/// path into `tx`; it signals completion to the caller by returning once
/// the traversal is exhausted (sentinel enqueueing is the worker pool's
/// responsibility, not the walker's).
pub struct Walker {
    root: PathBuf,
    options: WalkerOptions,
}

impl Walker {
    pub fn new(root: &Path, options: WalkerOptions) -> Result<Self> {
        if !root.exists() {
            return Err(Error::invalid_input(format!(
                "root path does not exist: {}",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(Error::invalid_input(format!(
                "root path is not a directory: {}",
                root.display()
            )));
        }
        Ok(Walker {
            root: root.to_path_buf(),
            options,
        })
    }

    /// Walks the tree, sending each candidate file path on `tx` and
    /// reporting discovery progress via `on_discover`. Checked against
    /// `cancel` between directory entries (not only between directories) so
    /// cancellation latency stays bounded even inside a very large
    /// directory.
    pub fn walk(
        &self,
        tx: &Sender<PathBuf>,
        cancel: &Arc<AtomicBool>,
        mut on_discover: impl FnMut(&Path, u64),
        mut on_error: impl FnMut(ScanError),
    ) {
        self.walk_dir(&self.root, 0, tx, cancel, &mut on_discover, &mut on_error);
    }

    fn walk_dir(
        &self,
        dir: &Path,
        depth: usize,
        tx: &Sender<PathBuf>,
        cancel: &Arc<AtomicBool>,
        on_discover: &mut impl FnMut(&Path, u64),
        on_error: &mut impl FnMut(ScanError),
    ) {
        if cancel.load(Ordering::Relaxed) {
            return;
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("failed to read directory {}: {e}", dir.display());
                on_error(ScanError {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                    phase: "discovery",
                });
                return;
            }
        };

        for entry in entries {
            if cancel.load(Ordering::Relaxed) {
                return;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    on_error(ScanError {
                        path: dir.to_path_buf(),
                        message: e.to_string(),
                        phase: "discovery",
                    });
                    continue;
                }
            };
            let path = entry.path();

            if self.is_excluded(&path) {
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    on_error(ScanError {
                        path: path.clone(),
                        message: e.to_string(),
                        phase: "discovery",
                    });
                    continue;
                }
            };

            if file_type.is_symlink() {
                // Recorded as metadata only if it is itself a file entry;
                // symlinks are never followed for recursion or hashing.
                continue;
            }

            if file_type.is_dir() {
                let within_depth = self
                    .options
                    .max_depth
                    .map(|max| depth < max)
                    .unwrap_or(true);
                if within_depth {
                    self.walk_dir(&path, depth + 1, tx, cancel, on_discover, on_error);
                }
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    on_error(ScanError {
                        path: path.clone(),
                        message: e.to_string(),
                        phase: "discovery",
                    });
                    continue;
                }
            };

            if size < self.options.min_size {
                continue;
            }
            if let Some(max) = self.options.max_size {
                if size > max {
                    log::warn!(
                        "skipping {} ({size} bytes > max_size {max})",
                        path.display()
                    );
                    continue;
                }
            }

            on_discover(&path, size);
            if tx.send(path).is_err() {
                // Receiver side gone (pool shutting down); nothing left to do.
                return;
            }
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => return false,
        };

        if self.options.exclusions.iter().any(|token| token == name) {
            return true;
        }

        self.options
            .exclude_globs
            .iter()
            .any(|pattern| glob_match(pattern, name))
    }
}

/// Minimal glob matcher supporting a single leading or trailing `*`, which
/// covers the exclusion patterns the spec names (`*.tmp`, `*.cache`,
/// `Thumbs.db`) without pulling in a full glob crate for one use site.
fn glob_match(pattern: &str, name: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        return name.ends_with(suffix);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }
    pattern == name
}
