//! Build reports for bagsmith
//!
//! Every build owns one append-only [`BuildReport`]. When the build reaches a
//! terminal state the report is finalized into a read-only
//! [`FinalizedReport`], which can be exported as JSON Lines.
//!
//! # Example
//!
//! ```no_run
//! use bagsmith_core_audit::{BuildReport, Level, Outcome};
//!
//! let mut report = BuildReport::new("build-123");
//! report.record(Level::Info, "creating", "bag created");
//! let report = report.finalize(Outcome::Done);
//! report.write_jsonl("build.jsonl").unwrap();
//! ```

pub mod error;
pub mod report;

// Re-export main types
pub use error::{Error, Result};
pub use report::{parse_report_log, BuildReport, FinalizedReport, Level, Outcome, ReportEntry};
