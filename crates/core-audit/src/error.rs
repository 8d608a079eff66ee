//! Error types for report operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for report operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while writing or reading a build report
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to create report file
    #[error("Failed to create report file: {path}")]
    CreateFailed { path: PathBuf },

    /// Report line is invalid or corrupted
    #[error("Invalid report entry at line {line}: {reason}")]
    InvalidEntry { line: usize, reason: String },

    /// Unknown severity level
    #[error("Invalid level: {0}")]
    InvalidLevel(String),
}

impl Error {
    /// Create a create failed error
    pub fn create_failed<P: Into<PathBuf>>(path: P) -> Self {
        Error::CreateFailed { path: path.into() }
    }

    /// Create an invalid entry error
    pub fn invalid_entry(line: usize, reason: &str) -> Self {
        Error::InvalidEntry {
            line,
            reason: reason.to_string(),
        }
    }

    /// Create an invalid level error
    pub fn invalid_level<S: Into<String>>(level: S) -> Self {
        Error::InvalidLevel(level.into())
    }
}
