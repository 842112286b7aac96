//! Error types for the scan-and-analyze engine.
//!
//! Per-file failures (permission denied on one entry, a transient read
//! error, an undecodable image) never construct this type while a scan is
//! running — they are folded into `ScanProgress`'s error sample and the
//! worker pool's error counters instead, so a single bad file never aborts
//! an otherwise-successful scan. Cancellation is likewise not an `Err`: a
//! cancelled scan returns its partial Tree with `ScanStats::cancelled` set.
//! Only structural failures and ambient CLI-level failures are ever
//! returned as `Err`.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine and its CLI driver.
#[derive(Error, Debug)]
pub enum Error {
    /// Scan root missing, not a directory, or otherwise rejected before walking starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Two trees merged with differing roots.
    #[error("merge error: {0}")]
    MergeError(String),

    /// A tree invariant (single parent, unique path) was violated.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// I/O errors from filesystem operations outside the per-file scan loop.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file parsing errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// TOML parsing errors.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors (config save).
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// JSON serialization errors.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Size parsing errors (e.g. `--min-size` / `--max-size`).
    #[error("Invalid size format: {0}")]
    SizeParseError(String),

    /// Worker count argument failed validation.
    #[error("Invalid worker count: {0}")]
    WorkerCountError(String),

    /// Path errors.
    #[error("Invalid path: {0}")]
    PathError(String),

    /// Snapshot load/diff errors (malformed snapshot file, id mismatch).
    #[error("Snapshot error: {0}")]
    SnapshotError(String),

    /// General errors.
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new invalid-input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a new merge error.
    pub fn merge<S: Into<String>>(msg: S) -> Self {
        Error::MergeError(msg.into())
    }

    /// Create a new internal-invariant error.
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        Error::InternalInvariant(msg.into())
    }

    /// Create a new general error with a custom message.
    pub fn general<S: Into<String>>(msg: S) -> Self {
        Error::General(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    /// Create a new size parse error.
    pub fn size_parse<S: Into<String>>(msg: S) -> Self {
        Error::SizeParseError(msg.into())
    }

    /// Create a new worker count error.
    pub fn worker_count<S: Into<String>>(msg: S) -> Self {
        Error::WorkerCountError(msg.into())
    }

    /// Create a new path error.
    pub fn path<S: Into<String>>(msg: S) -> Self {
        Error::PathError(msg.into())
    }

    /// Create a new snapshot error.
    pub fn snapshot<S: Into<String>>(msg: S) -> Self {
        Error::SnapshotError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_error_display() {
        let err = Error::general("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
