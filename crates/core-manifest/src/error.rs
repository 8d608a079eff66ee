//! Error types for bag operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for bag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating, reading or rewriting a bag
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Directory traversal failed
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Checksum algorithm name is not in the supported set
    #[error("Unsupported checksum algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Bag creation was asked for zero algorithms
    #[error("At least one checksum algorithm is required")]
    NoAlgorithms,

    /// Source directory is missing or not a directory
    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Source directory holds no regular files
    #[error("Source directory is empty: {path}")]
    EmptySource { path: PathBuf },

    /// Target directory already exists and holds entries
    #[error("Target directory is not empty: {path}")]
    TargetNotEmpty { path: PathBuf },

    /// A required tag file is absent
    #[error("Missing tag file: {path}")]
    MissingTagFile { path: PathBuf },

    /// A manifest or tag file could not be parsed
    #[error("Malformed {file} at line {line}: {reason}")]
    Malformed {
        file: String,
        line: usize,
        reason: String,
    },

    /// Path cannot be represented inside a bag
    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    /// Worker pool could not be built
    #[error("Failed to start hashing workers: {0}")]
    WorkerPool(String),
}

impl Error {
    /// Create a malformed-file error
    pub fn malformed<F: Into<String>, R: Into<String>>(file: F, line: usize, reason: R) -> Self {
        Error::Malformed {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a missing tag file error
    pub fn missing_tag_file<P: Into<PathBuf>>(path: P) -> Self {
        Error::MissingTagFile { path: path.into() }
    }

    /// Create an invalid path error
    pub fn invalid_path<P: Into<PathBuf>>(path: P) -> Self {
        Error::InvalidPath { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_error() {
        let err = Error::malformed("bagit.txt", 2, "missing ':' separator");
        assert!(matches!(err, Error::Malformed { line: 2, .. }));
        assert_eq!(
            err.to_string(),
            "Malformed bagit.txt at line 2: missing ':' separator"
        );
    }

    #[test]
    fn test_missing_tag_file_error() {
        let err = Error::missing_tag_file("/bags/one/bag-info.txt");
        assert!(err.to_string().contains("bag-info.txt"));
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
