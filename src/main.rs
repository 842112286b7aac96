//! scanengine - CLI entry point
//!
//! This module contains the main function that serves as the entry point
//! for the scanengine command-line tool. It handles argument parsing,
//! configuration loading, logging setup, and delegates to the core library.

use clap::Parser;
use env_logger::Env;
use scanengine::cli::{parse_size, Args, Command, ScanArgs, SnapshotAction};
use scanengine::duplicates::DetectOptions;
use scanengine::report::{self, ReportOptions};
use scanengine::snapshot::{self, Snapshot};
use scanengine::walker::WalkerOptions;
use scanengine::worker::scan_cancellable;
use scanengine::{CancelHandle, Config, Error, Result, ScanConfig, ScanProgress};
use std::error::Error as StdError;
use std::io::Write;
use std::path::Path;
use std::process;

fn main() {
    // Initialize logger with RUST_LOG env var support
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        log::error!("Error: {}", e);
        eprintln!("Error: {}", e);

        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {}", err);
            source = err.source();
        }

        process::exit(1);
    }
}

/// Main application logic: loads configuration, dispatches to the requested
/// subcommand, and renders the result.
fn run() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let config = Config::load()?;
    let report_opts = ReportOptions {
        color: !args.no_color,
    };

    match &args.command {
        Command::Scan(scan_args) => {
            let (tree, stats) = run_scan(scan_args, &config, args.quiet)?;
            report::print_scan_summary(&tree, &stats, &report_opts, args.output)?;
        }
        Command::Duplicates(scan_args) => {
            let (tree, _stats) = run_scan(scan_args, &config, args.quiet)?;
            let options = DetectOptions {
                detect_exact: !scan_args.no_exact,
                detect_near: !scan_args.no_near,
                perceptual_threshold: scan_args.perceptual_threshold,
            };
            let report_data = scanengine::detect_duplicates(&tree, &options);
            report::print_duplicate_report(&report_data, &report_opts, args.output)?;
        }
        Command::Snapshot { action } => match action {
            SnapshotAction::Create { scan, out, label } => {
                let (tree, _stats) = run_scan(scan, &config, args.quiet)?;
                let scan_id = uuid::Uuid::new_v4().to_string();
                let snapshot = Snapshot::create(scan_id, &tree, label.clone(), None);
                let json = serde_json::to_string_pretty(&snapshot)?;
                std::fs::write(out, json)?;
            }
            SnapshotAction::Diff { from, to } => {
                let a = load_snapshot(from)?;
                let b = load_snapshot(to)?;
                let diff = snapshot::diff(&a, &b);
                report::print_diff(&diff, &report_opts, args.output)?;
            }
        },
    }

    Ok(())
}

/// Resolves a scan subcommand's args + the loaded config into a `ScanConfig`
/// and runs it, printing per-file progress to stderr unless `quiet`.
fn run_scan(
    scan_args: &ScanArgs,
    config: &Config,
    quiet: bool,
) -> Result<(scanengine::Tree, scanengine::ScanStats)> {
    let path = Path::new(&scan_args.path);
    if !path.exists() {
        return Err(Error::invalid_input(format!(
            "Path does not exist: {}",
            path.display()
        )));
    }

    let mut exclusions = WalkerOptions::default().exclusions;
    exclusions.extend(config.scan.exclusions.iter().cloned());
    exclusions.extend(scan_args.exclude.iter().cloned());

    let mut exclude_globs = config.scan.exclude_globs.clone();
    exclude_globs.extend(scan_args.exclude_glob.iter().cloned());

    let min_size = match &scan_args.min_size {
        Some(s) => parse_size(s)?,
        None => config.scan.min_size,
    };
    let max_size = match &scan_args.max_size {
        Some(s) => Some(parse_size(s)?),
        None => config.scan.max_size,
    };

    let walker_options = WalkerOptions {
        exclusions,
        exclude_globs,
        max_depth: scan_args.max_depth.or(config.scan.max_depth),
        min_size,
        max_size,
    };

    let workers = if scan_args.workers == 0 {
        config.resolved_workers()
    } else {
        scan_args.workers
    };

    let scan_config = ScanConfig {
        num_workers: workers,
        max_queue_size: scan_args.queue_size,
        walker: walker_options,
        compute_content_hash: !scan_args.no_content_hash,
        compute_perceptual_hash: scan_args.perceptual_hash || config.duplicates.perceptual_hashing,
        extract_properties: scan_args.properties || config.scan.extract_properties,
        error_sample_size: config.performance.error_sample_size,
    };

    let cancel = CancelHandle::new();
    let on_progress: Box<dyn FnMut(&ScanProgress) + Send> = if quiet {
        Box::new(|_: &ScanProgress| {})
    } else {
        Box::new(|progress: &ScanProgress| {
            eprint!(
                "\rscanned {}/{} files ({:.0}%) - {}",
                progress.processed_files,
                progress.total_files,
                progress.progress_percent(),
                progress.current_path
            );
            let _ = std::io::stderr().flush();
        })
    };

    let result = scan_cancellable(path, &scan_config, &cancel, on_progress);
    if !quiet {
        eprintln!();
    }
    result
}

fn load_snapshot(path: &str) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
