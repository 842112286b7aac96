//! Benchmarks for the concurrent scan pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scanengine::{scan, ScanConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn create_benchmark_tree(depth: usize, files_per_dir: usize, dirs_per_dir: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    create_tree_recursive(temp_dir.path(), depth, files_per_dir, dirs_per_dir);
    temp_dir
}

fn create_tree_recursive(path: &Path, depth: usize, files_per_dir: usize, dirs_per_dir: usize) {
    if depth == 0 {
        return;
    }

    for i in 0..files_per_dir {
        let file_path = path.join(format!("file_{}.txt", i));
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "This is test file {}", i).unwrap();
    }

    for i in 0..dirs_per_dir {
        let dir_path = path.join(format!("dir_{}", i));
        fs::create_dir(&dir_path).unwrap();
        create_tree_recursive(&dir_path, depth - 1, files_per_dir, dirs_per_dir);
    }
}

fn benchmark_single_worker(c: &mut Criterion) {
    let temp_dir = create_benchmark_tree(3, 10, 3);
    let path = temp_dir.path();

    c.bench_function("scan_single_worker", |b| {
        b.iter(|| {
            let config = ScanConfig {
                num_workers: 1,
                ..ScanConfig::default()
            };
            let _ = scan(black_box(path), &config).unwrap();
        });
    });
}

fn benchmark_parallel_workers(c: &mut Criterion) {
    let temp_dir = create_benchmark_tree(4, 20, 4);
    let path = temp_dir.path();

    c.bench_function("scan_parallel_workers", |b| {
        b.iter(|| {
            let config = ScanConfig {
                num_workers: 8,
                ..ScanConfig::default()
            };
            let _ = scan(black_box(path), &config).unwrap();
        });
    });
}

fn benchmark_with_perceptual_hashing(c: &mut Criterion) {
    let temp_dir = create_benchmark_tree(3, 15, 3);
    let path = temp_dir.path();

    c.bench_function("scan_with_perceptual_hashing", |b| {
        b.iter(|| {
            let config = ScanConfig {
                num_workers: 4,
                compute_perceptual_hash: true,
                ..ScanConfig::default()
            };
            let _ = scan(black_box(path), &config).unwrap();
        });
    });
}

criterion_group!(
    benches,
    benchmark_single_worker,
    benchmark_parallel_workers,
    benchmark_with_perceptual_hashing
);
criterion_main!(benches);
