/// Structured error types for tropa-core.
///
/// Uses `thiserror` for composable library errors. The `tropactl` binary
/// wraps these in `anyhow` for reporting.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tropa-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Configuration error in {path:?}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    /// Configuration value is invalid
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for tropa-core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config parse error
    pub fn config_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
