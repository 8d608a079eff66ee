/*!
 * Per-build report writer that mirrors every entry to tracing
 */

use bagsmith_core_audit::{BuildReport, FinalizedReport, Level, Outcome};
use tracing::{error, info, warn};

/// Owns the report of one build
#[derive(Debug)]
pub struct Journal {
    report: BuildReport,
}

impl Journal {
    pub fn new<S: Into<String>>(build_id: S) -> Self {
        Self {
            report: BuildReport::new(build_id),
        }
    }

    pub fn build_id(&self) -> &str {
        self.report.build_id()
    }

    pub fn info<M: Into<String>>(&mut self, origin: &str, message: M) {
        self.record(Level::Info, origin, message.into());
    }

    pub fn warning<M: Into<String>>(&mut self, origin: &str, message: M) {
        self.record(Level::Warning, origin, message.into());
    }

    pub fn error<M: Into<String>>(&mut self, origin: &str, message: M) {
        self.record(Level::Error, origin, message.into());
    }

    fn record(&mut self, level: Level, origin: &str, message: String) {
        let build = self.report.build_id();
        match level {
            Level::Info => info!(build, stage = origin, "{}", message),
            Level::Warning => warn!(build, stage = origin, "{}", message),
            Level::Error => error!(build, stage = origin, "{}", message),
        }
        self.report.record(level, origin, message);
    }

    pub fn finalize(self, outcome: Outcome) -> FinalizedReport {
        self.report.finalize(outcome)
    }
}
