//! Human-readable and JSON rendering of scan, duplicate, and diff results.

use colored::*;

use crate::duplicates::DuplicateReport;
use crate::error::Result;
use crate::snapshot::SnapshotDiff;
use crate::tree::Tree;
use crate::worker::ScanStats;

/// Output format selected by the CLI driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-oriented summary
    Human,
    /// Machine-readable JSON
    Json,
}

/// Whether to colorize human-readable output; auto-detection lives at the
/// CLI layer since it depends on the terminal, which this module never
/// touches directly.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub color: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions { color: true }
    }
}

fn paint(s: String, color: bool, f: impl Fn(ColoredString) -> ColoredString) -> String {
    if color {
        f(s.normal()).to_string()
    } else {
        s
    }
}

/// Format size in human-readable format.
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.1} {}", size, UNITS[unit_idx])
    }
}

/// Prints a scan summary: file/byte counts, throughput, and any sampled
/// errors.
pub fn print_scan_summary(tree: &Tree, stats: &ScanStats, opts: &ReportOptions, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "root": tree.root,
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Human => {
            println!(
                "{}",
                paint(format!("Scanned {}", tree.root_path), opts.color, |s| s.bold())
            );
            println!("  files:      {}", tree.file_count());
            println!("  size:       {}", format_size(stats.total_bytes));
            println!("  elapsed:    {:.2}s", stats.elapsed_seconds);
            println!("  throughput: {:.0} files/s", stats.avg_throughput());
            if stats.cancelled {
                println!("  {}", paint("cancelled: partial results".to_string(), opts.color, |s| s.yellow()));
            }
            if stats.total_errors > 0 {
                println!(
                    "  {}",
                    paint(format!("errors: {} (sample below)", stats.total_errors), opts.color, |s| s.red())
                );
                for err in &stats.errors {
                    println!("    [{}] {}: {}", err.phase, err.path.display(), err.message);
                }
            }
        }
    }
    Ok(())
}

/// Prints a duplicate-detection report.
pub fn print_duplicate_report(report: &DuplicateReport, opts: &ReportOptions, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Human => {
            println!(
                "{}",
                paint(
                    format!(
                        "{} exact groups, {} near-duplicate groups",
                        report.stats.exact_groups, report.stats.near_groups
                    ),
                    opts.color,
                    |s| s.bold()
                )
            );
            println!(
                "  wastage: {} ({:.1} MiB), largest group: {} files",
                format_size(report.stats.total_wastage_bytes),
                report.stats.total_wastage_mib(),
                report.stats.largest_group_size
            );

            for group in report.exact.iter().chain(report.near.iter()) {
                println!(
                    "\n  {} [{:?}] {} files, {} wasted",
                    group.id,
                    group.kind,
                    group.members.len(),
                    format_size(group.wastage)
                );
                for member in &group.members {
                    let marker = if member.path == group.representative.path {
                        "*"
                    } else {
                        " "
                    };
                    println!("    {} {}", marker, member.path);
                }
            }
        }
    }
    Ok(())
}

/// Prints a snapshot diff.
pub fn print_diff(diff: &SnapshotDiff, opts: &ReportOptions, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(diff)?);
        }
        OutputFormat::Human => {
            println!(
                "{}",
                paint(
                    format!("{} changes, {:+} bytes", diff.total_changes(), diff.size_delta()),
                    opts.color,
                    |s| s.bold()
                )
            );
            for a in &diff.added {
                println!("  {} {} ({})", paint("+".to_string(), opts.color, |s| s.green()), a.path, format_size(a.size));
            }
            for r in &diff.removed {
                println!("  {} {} ({})", paint("-".to_string(), opts.color, |s| s.red()), r.path, format_size(r.old_size));
            }
            for m in &diff.modified {
                println!(
                    "  {} {} ({} -> {})",
                    paint("~".to_string(), opts.color, |s| s.yellow()),
                    m.path,
                    format_size(m.old_size),
                    format_size(m.new_size)
                );
            }
            for mv in &diff.renamed {
                println!(
                    "  {} {} -> {}",
                    paint("→".to_string(), opts.color, |s| s.cyan()),
                    mv.from,
                    mv.to
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_picks_appropriate_unit() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(1024 * 1024 * 3), "3.0 MB");
    }
}
