//! Configuration file handling
//!
//! This module manages loading and parsing configuration from ~/.scanengine.toml

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scan options
    #[serde(default)]
    pub scan: ScanConfigFile,

    /// Duplicate detection options
    #[serde(default)]
    pub duplicates: DuplicateConfig,

    /// Performance options
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Scan configuration persisted across runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfigFile {
    /// Exclusion tokens added on top of the built-in defaults
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Glob patterns excluded by file name
    #[serde(default)]
    pub exclude_globs: Vec<String>,

    /// Default max depth (None = unlimited)
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Minimum file size in bytes to consider
    #[serde(default)]
    pub min_size: u64,

    /// Maximum file size in bytes to consider (None = unlimited)
    #[serde(default)]
    pub max_size: Option<u64>,

    /// Extract best-effort properties (image dimensions, utf8 validity) by default
    #[serde(default)]
    pub extract_properties: bool,
}

/// Duplicate-detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateConfig {
    /// Compute perceptual hashes during scan by default
    #[serde(default)]
    pub perceptual_hashing: bool,

    /// Hamming distance threshold for near-duplicate clustering
    #[serde(default = "default_perceptual_threshold")]
    pub perceptual_threshold: u32,
}

/// Performance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Number of worker threads (0 = auto)
    #[serde(default)]
    pub workers: usize,

    /// Bounded queue capacity between the walker and the worker pool
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Bounded sample size for per-file scan errors
    #[serde(default = "default_error_sample_size")]
    pub error_sample_size: usize,
}

impl Default for ScanConfigFile {
    fn default() -> Self {
        Self {
            exclusions: Vec::new(),
            exclude_globs: Vec::new(),
            max_depth: None,
            min_size: 0,
            max_size: None,
            extract_properties: false,
        }
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            perceptual_hashing: false,
            perceptual_threshold: default_perceptual_threshold(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_size: default_queue_size(),
            error_sample_size: default_error_sample_size(),
        }
    }
}

impl Config {
    /// Load configuration from ~/.scanengine.toml
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            log::debug!("No config file found at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        log::debug!("Loading config from {:?}", config_path);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to ~/.scanengine.toml
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| Error::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Resolves the configured worker count, falling back to the number of
    /// available CPUs when `workers` is 0.
    pub fn resolved_workers(&self) -> usize {
        if self.performance.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.performance.workers
        }
    }
}

/// Get the path to the config file
fn get_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| Error::config("Could not determine home directory"))?;

    Ok(home.join(".scanengine.toml"))
}

fn default_queue_size() -> usize {
    10_000
}

fn default_error_sample_size() -> usize {
    50
}

fn default_perceptual_threshold() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.performance.queue_size, 10_000);
        assert!(!config.duplicates.perceptual_hashing);
        assert_eq!(config.duplicates.perceptual_threshold, 10);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.performance.workers, parsed.performance.workers);
        assert_eq!(config.scan.min_size, parsed.scan.min_size);
    }

    #[test]
    fn resolved_workers_falls_back_to_available_parallelism() {
        let config = Config::default();
        assert!(config.resolved_workers() >= 1);
    }

    #[test]
    fn resolved_workers_honors_explicit_setting() {
        let mut config = Config::default();
        config.performance.workers = 7;
        assert_eq!(config.resolved_workers(), 7);
    }
}
