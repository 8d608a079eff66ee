/*!
 * Error types for bagsmith
 */

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use bagsmith_core_audit::FinalizedReport;
use bagsmith_core_manifest::Verdict;

use crate::core::BuildState;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

#[derive(Debug)]
pub enum BuildError {
    /// Bad input detected before anything was written
    Configuration(String),

    /// Creation, amendment or merge failed, or the primitive reported an error
    Packaging(String),

    /// An internal invariant does not hold
    Consistency(String),

    /// The finished bag failed its own validation
    ValidationFailure(Verdict),
}

impl BuildError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        BuildError::Configuration(message.into())
    }

    pub fn packaging<S: Into<String>>(message: S) -> Self {
        BuildError::Packaging(message.into())
    }

    pub fn consistency<S: Into<String>>(message: S) -> Self {
        BuildError::Consistency(message.into())
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::ValidationFailure(_) => EXIT_INTEGRITY,
            BuildError::Configuration(_)
            | BuildError::Packaging(_)
            | BuildError::Consistency(_) => EXIT_FATAL,
        }
    }

    /// Whether the target directory may hold partial output
    pub fn leaves_partial_state(&self) -> bool {
        !matches!(self, BuildError::Configuration(_))
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            BuildError::Configuration(_) => ErrorCategory::Configuration,
            BuildError::Packaging(_) => ErrorCategory::Packaging,
            BuildError::Consistency(_) => ErrorCategory::Consistency,
            BuildError::ValidationFailure(_) => ErrorCategory::Validation,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Packaging,
    Consistency,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Packaging => write!(f, "packaging"),
            ErrorCategory::Consistency => write!(f, "consistency"),
            ErrorCategory::Validation => write!(f, "validation"),
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            BuildError::Packaging(msg) => write!(f, "Packaging error: {}", msg),
            BuildError::Consistency(msg) => write!(f, "Consistency error: {}", msg),
            BuildError::ValidationFailure(verdict) => write!(
                f,
                "Validation failed: {} checksum violation(s), {} structural problem(s)",
                verdict.violations.len(),
                verdict.problems.len()
            ),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<io::Error> for BuildError {
    fn from(err: io::Error) -> Self {
        BuildError::Packaging(format!("I/O error: {}", err))
    }
}

impl From<bagsmith_core_manifest::Error> for BuildError {
    fn from(err: bagsmith_core_manifest::Error) -> Self {
        BuildError::Packaging(err.to_string())
    }
}

/// A build that ended in `Failed`
///
/// Carries the error together with the finalized report, the last state
/// the build entered and the target directory, which is never cleaned up.
#[derive(Debug)]
pub struct BuildFailure {
    pub error: BuildError,
    pub report: FinalizedReport,
    pub state: BuildState,
    pub target: PathBuf,
}

impl BuildFailure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Build failed while {}: {}", self.state, self.error)
    }
}

impl std::error::Error for BuildFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
