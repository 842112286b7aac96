//! Worker, WorkerPool, and the ScanProgress/cancellation surface.
//!
//! Translated from the original asyncio queue-of-tasks model (one shared
//! queue, N cooperative worker tasks, sentinel shutdown) to OS threads over
//! a bounded crossbeam channel — the spec calls the two models equivalent
//! at this level of description: what matters is a bounded queue, a
//! per-worker local tree, and a deterministic merge order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::hasher;
use crate::metadata::Metadata;
use crate::tree::Tree;
use crate::walker::{Walker, WalkerOptions};

/// An item discovered during the walk but not yet processed by a worker.
type QueueItem = Option<PathBuf>;

/// Configuration for a single scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub num_workers: usize,
    pub max_queue_size: usize,
    pub walker: WalkerOptions,
    pub compute_content_hash: bool,
    pub compute_perceptual_hash: bool,
    pub extract_properties: bool,
    /// How many per-file errors to retain as a representative sample.
    pub error_sample_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            num_workers: 4,
            max_queue_size: 10_000,
            walker: WalkerOptions::default(),
            compute_content_hash: true,
            compute_perceptual_hash: false,
            extract_properties: false,
            error_sample_size: 50,
        }
    }
}

/// A single recorded per-file failure. Discovery-phase failures come from
/// the walker (directory read errors); processing-phase failures come from
/// a worker (metadata or hashing failure on a specific file).
#[derive(Debug, Clone, Serialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
    pub phase: &'static str,
}

/// Per-worker counters, updated live so a progress monitor can sample them
/// without waiting for the worker to finish.
#[derive(Default)]
struct WorkerCounters {
    files: AtomicU64,
    bytes: AtomicU64,
    errors: AtomicU64,
}

/// Final statistics for a single worker, captured once it returns.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub files_processed: u64,
    pub bytes_processed: u64,
    pub errors: u64,
    pub elapsed_seconds: f64,
}

impl WorkerStats {
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.files_processed as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

/// A point-in-time view of scan advancement. Read-only to callers; mutated
/// only by the coordinator driving the scan. Polling this has no effect on
/// the scan's outcome — a caller that never reads it gets an identical
/// result.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    pub total_files: u64,
    pub processed_files: u64,
    pub total_bytes: u64,
    pub processed_bytes: u64,
    pub current_path: String,
    pub elapsed_seconds: f64,
    pub cancelled: bool,
    pub errors: Vec<ScanError>,
}

impl ScanProgress {
    pub fn progress_percent(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.processed_files as f64 / self.total_files as f64) * 100.0
        }
    }

    pub fn files_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.processed_files as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

/// Aggregated statistics across the whole pool, returned alongside the
/// merged Tree.
#[derive(Debug, Clone, Serialize)]
pub struct ScanStats {
    pub total_files: u64,
    pub total_bytes: u64,
    pub total_errors: u64,
    pub elapsed_seconds: f64,
    pub cancelled: bool,
    pub workers: Vec<WorkerStats>,
    pub errors: Vec<ScanError>,
}

impl ScanStats {
    /// Throughput capped by the slowest worker, matching how a straggler
    /// caps overall throughput rather than an average across workers that
    /// finished at different times.
    pub fn avg_throughput(&self) -> f64 {
        let max_elapsed = self
            .workers
            .iter()
            .map(|w| w.elapsed_seconds)
            .fold(0.0_f64, f64::max);
        if max_elapsed > 0.0 {
            self.total_files as f64 / max_elapsed
        } else {
            0.0
        }
    }
}

/// Shared handle letting a caller request cancellation of an in-flight
/// scan. Cloned cheaply; dropping every handle has no special effect.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn inner(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a full scan: spawns the walker and N workers, merges their partial
/// trees deterministically, and returns the merged tree plus aggregate
/// statistics. Equivalent to the language-neutral `scan(root, config)` in
/// the external interface.
pub fn scan(root: &Path, config: &ScanConfig) -> Result<(Tree, ScanStats)> {
    scan_cancellable(root, config, &CancelHandle::new(), |_| {})
}

/// As `scan`, but accepts an externally-held cancel handle and an optional
/// progress callback invoked periodically while the scan runs.
pub fn scan_cancellable(
    root: &Path,
    config: &ScanConfig,
    cancel: &CancelHandle,
    on_progress: impl FnMut(&ScanProgress) + Send + 'static,
) -> Result<(Tree, ScanStats)> {
    let walker = Walker::new(root, config.walker.clone())?;
    let root_string = root.to_string_lossy().replace('\\', "/");
    let root_string = root_string.trim_end_matches('/').to_string();

    log::info!(
        "starting scan of {} with {} workers",
        root_string,
        config.num_workers
    );

    let (tx, rx) = bounded::<QueueItem>(config.max_queue_size.max(1));
    let start = Instant::now();

    let discovered_files = Arc::new(AtomicU64::new(0));
    let discovered_bytes = Arc::new(AtomicU64::new(0));
    let current_path = Arc::new(Mutex::new(String::new()));
    let errors: Arc<Mutex<Vec<ScanError>>> = Arc::new(Mutex::new(Vec::new()));
    let counters: Arc<Vec<WorkerCounters>> = Arc::new(
        (0..config.num_workers)
            .map(|_| WorkerCounters::default())
            .collect(),
    );

    let push_error = {
        let errors = Arc::clone(&errors);
        let limit = config.error_sample_size;
        move |err: ScanError| {
            let mut guard = errors.lock().unwrap();
            if guard.len() < limit {
                guard.push(err);
            }
        }
    };

    // Worker threads: each owns its own partial Tree and processes tasks
    // until it sees a sentinel.
    let mut worker_handles = Vec::with_capacity(config.num_workers);
    for worker_id in 0..config.num_workers {
        let rx = rx.clone();
        let root_string = root_string.clone();
        let counters = Arc::clone(&counters);
        let push_error = push_error.clone();
        let want_content = config.compute_content_hash;
        let want_perceptual = config.compute_perceptual_hash;
        let extract_properties = config.extract_properties;

        let handle = thread::spawn(move || -> (Tree, WorkerStats) {
            let worker_start = Instant::now();
            let mut tree = Tree::new(root_string);
            let mut files_processed = 0u64;
            let mut bytes_processed = 0u64;
            let mut local_errors = 0u64;

            while let Ok(item) = rx.recv() {
                let Some(path) = item else {
                    break;
                };

                match process_one(&path, want_content, want_perceptual, extract_properties) {
                    Ok((metadata, hashes, size)) => {
                        let path_str = path.to_string_lossy().replace('\\', "/");
                        if tree.attach_file(&path_str, metadata, hashes).is_ok() {
                            log::trace!("worker {worker_id} attached {path_str}");
                            files_processed += 1;
                            bytes_processed += size;
                            counters[worker_id].files.fetch_add(1, Ordering::Relaxed);
                            counters[worker_id]
                                .bytes
                                .fetch_add(size, Ordering::Relaxed);
                        }
                    }
                    Err(message) => {
                        local_errors += 1;
                        counters[worker_id].errors.fetch_add(1, Ordering::Relaxed);
                        log::warn!("worker {worker_id} failed on {}: {message}", path.display());
                        push_error(ScanError {
                            path,
                            message,
                            phase: "processing",
                        });
                    }
                }
            }

            let stats = WorkerStats {
                worker_id,
                files_processed,
                bytes_processed,
                errors: local_errors,
                elapsed_seconds: worker_start.elapsed().as_secs_f64(),
            };
            log::debug!(
                "worker {worker_id} done: {} files, {} errors, {:.2}s",
                stats.files_processed,
                stats.errors,
                stats.elapsed_seconds
            );
            (tree, stats)
        });
        worker_handles.push(handle);
    }

    // Progress monitor: samples the shared counters periodically and hands
    // them to the caller's callback. Purely observational — nothing
    // downstream depends on it having run.
    let monitor_stop = Arc::new(AtomicBool::new(false));
    let monitor_handle = {
        let discovered_files = Arc::clone(&discovered_files);
        let discovered_bytes = Arc::clone(&discovered_bytes);
        let current_path = Arc::clone(&current_path);
        let counters = Arc::clone(&counters);
        let errors = Arc::clone(&errors);
        let cancel_flag = cancel.inner();
        let stop = Arc::clone(&monitor_stop);
        let mut on_progress = on_progress;
        thread::spawn(move || loop {
            thread::sleep(Duration::from_millis(200));
            let progress = snapshot_progress(
                &discovered_files,
                &discovered_bytes,
                &current_path,
                &counters,
                &errors,
                cancel_flag.load(Ordering::Relaxed),
                start,
            );
            on_progress(&progress);
            if stop.load(Ordering::Relaxed) {
                break;
            }
        })
    };

    // Walker runs on the calling thread: the single producer. It only knows
    // how to send bare paths, so fan them through a same-capacity relay
    // channel that wraps each one as a `QueueItem` for the worker pool.
    let (raw_tx, raw_rx) = bounded::<PathBuf>(config.max_queue_size.max(1));
    let relay_tx = tx.clone();
    let relay_handle = thread::spawn(move || {
        for path in raw_rx.iter() {
            if relay_tx.send(Some(path)).is_err() {
                break;
            }
        }
    });

    let cancel_flag = cancel.inner();
    walker.walk(
        &raw_tx,
        &cancel_flag,
        |path, size| {
            discovered_files.fetch_add(1, Ordering::Relaxed);
            discovered_bytes.fetch_add(size, Ordering::Relaxed);
            *current_path.lock().unwrap() = path.to_string_lossy().to_string();
        },
        |err| {
            push_error(ScanError {
                path: err.path,
                message: err.message,
                phase: err.phase,
            });
        },
    );
    drop(raw_tx);
    let _ = relay_handle.join();

    for _ in 0..config.num_workers {
        let _ = tx.send(None);
    }
    drop(tx);

    monitor_stop.store(true, Ordering::Relaxed);
    let _ = monitor_handle.join();

    let mut worker_trees = Vec::with_capacity(config.num_workers);
    let mut worker_stats = Vec::with_capacity(config.num_workers);
    for handle in worker_handles {
        let (tree, stats) = handle
            .join()
            .map_err(|_| Error::invariant("worker thread panicked"))?;
        worker_trees.push((stats.worker_id, tree));
        worker_stats.push(stats);
    }
    worker_trees.sort_by_key(|(id, _)| *id);

    let mut merged = Tree::new(root_string.clone());
    for (_, worker_tree) in &worker_trees {
        merged.merge(worker_tree)?;
    }
    log::info!(
        "merged {} worker trees into {} files under {}",
        worker_trees.len(),
        merged.file_count(),
        root_string
    );

    // Cancellation is a reportable outcome, not a fatal one: the engine
    // returns the partial Tree it already has, with `ScanStats::cancelled`
    // set, so a caller can still use what was processed before the signal.
    let cancelled = cancel.is_cancelled();
    let total_files: u64 = worker_stats.iter().map(|w| w.files_processed).sum();
    let total_bytes: u64 = worker_stats.iter().map(|w| w.bytes_processed).sum();
    let total_errors: u64 = worker_stats.iter().map(|w| w.errors).sum();
    let errors_sample = errors.lock().unwrap().clone();

    log::info!(
        "scan of {} complete: {} files, {} errors, cancelled={}, {:.2}s",
        root_string,
        total_files,
        total_errors,
        cancelled,
        start.elapsed().as_secs_f64()
    );

    Ok((
        merged,
        ScanStats {
            total_files,
            total_bytes,
            total_errors,
            elapsed_seconds: start.elapsed().as_secs_f64(),
            cancelled,
            workers: worker_stats,
            errors: errors_sample,
        },
    ))
}

#[allow(clippy::type_complexity)]
fn process_one(
    path: &Path,
    want_content: bool,
    want_perceptual: bool,
    extract_properties: bool,
) -> std::result::Result<(Metadata, HashMap<String, String>, u64), String> {
    let metadata = Metadata::extract(path, extract_properties);
    let size = metadata.size;

    let hash_result = hasher::hash_file(path, want_content, want_perceptual);
    let mut hashes = HashMap::new();
    match hash_result.content_hash {
        Some(h) => {
            hashes.insert("content".to_string(), h);
        }
        None if want_content => {
            return Err(format!("failed to hash {}", path.display()));
        }
        None => {}
    }
    if let Some(p) = hash_result.perceptual_hash {
        hashes.insert("perceptual".to_string(), hasher::format_perceptual_hash(p));
    }

    Ok((metadata, hashes, size))
}

#[allow(clippy::too_many_arguments)]
fn snapshot_progress(
    discovered_files: &AtomicU64,
    discovered_bytes: &AtomicU64,
    current_path: &Mutex<String>,
    counters: &[WorkerCounters],
    errors: &Mutex<Vec<ScanError>>,
    cancelled: bool,
    start: Instant,
) -> ScanProgress {
    let processed_files: u64 = counters.iter().map(|c| c.files.load(Ordering::Relaxed)).sum();
    let processed_bytes: u64 = counters.iter().map(|c| c.bytes.load(Ordering::Relaxed)).sum();

    ScanProgress {
        total_files: discovered_files.load(Ordering::Relaxed),
        processed_files,
        total_bytes: discovered_bytes.load(Ordering::Relaxed),
        processed_bytes,
        current_path: current_path.lock().unwrap().clone(),
        elapsed_seconds: start.elapsed().as_secs_f64(),
        cancelled,
        errors: errors.lock().unwrap().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn scans_basic_tree_and_merges_deterministically() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            let mut f = File::create(dir.path().join(format!("f{i}.txt"))).unwrap();
            write!(f, "content {i}").unwrap();
        }

        let config = ScanConfig {
            num_workers: 3,
            ..ScanConfig::default()
        };
        let (tree, stats) = scan(dir.path(), &config).unwrap();

        assert_eq!(tree.file_count(), 10);
        assert_eq!(stats.total_files, 10);
        assert_eq!(stats.total_errors, 0);
        assert!(!stats.cancelled);
    }

    #[test]
    fn merge_is_independent_of_worker_count() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            fs::write(dir.path().join(format!("f{i}.txt")), format!("{i}")).unwrap();
        }

        let config_one = ScanConfig {
            num_workers: 1,
            ..ScanConfig::default()
        };
        let config_many = ScanConfig {
            num_workers: 8,
            ..ScanConfig::default()
        };

        let (tree_one, _) = scan(dir.path(), &config_one).unwrap();
        let (tree_many, _) = scan(dir.path(), &config_many).unwrap();

        let mut paths_one: Vec<_> = tree_one.traverse().iter().map(|f| f.path.clone()).collect();
        let mut paths_many: Vec<_> = tree_many.traverse().iter().map(|f| f.path.clone()).collect();
        paths_one.sort();
        paths_many.sort();
        assert_eq!(paths_one, paths_many);
    }

    #[test]
    fn cancellation_yields_partial_but_consistent_tree() {
        let dir = TempDir::new().unwrap();
        for i in 0..200 {
            fs::write(dir.path().join(format!("f{i}.txt")), format!("{i}")).unwrap();
        }

        let config = ScanConfig::default();
        let cancel = CancelHandle::new();
        cancel.cancel();

        let result = scan_cancellable(dir.path(), &config, &cancel, |_| {});
        let (tree, stats) = result.unwrap_or_else(|_| {
            panic!("cancellation should return a partial result, not an error")
        });
        assert!(stats.cancelled);
        assert_eq!(tree.file_count() as u64, stats.total_files);
    }

    #[test]
    fn avg_throughput_uses_the_slowest_worker() {
        let stats = ScanStats {
            total_files: 100,
            total_bytes: 0,
            total_errors: 0,
            elapsed_seconds: 1.0,
            cancelled: false,
            workers: vec![
                WorkerStats {
                    worker_id: 0,
                    files_processed: 60,
                    bytes_processed: 0,
                    errors: 0,
                    elapsed_seconds: 1.0,
                },
                WorkerStats {
                    worker_id: 1,
                    files_processed: 40,
                    bytes_processed: 0,
                    errors: 0,
                    elapsed_seconds: 2.0,
                },
            ],
            errors: Vec::new(),
        };
        assert_eq!(stats.avg_throughput(), 50.0);
    }
}
