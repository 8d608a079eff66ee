//! Per-build report
//!
//! A [`BuildReport`] is owned by exactly one build and only ever appended
//! to. Finalizing it consumes the report and yields a [`FinalizedReport`]
//! that exposes the entries read-only and can be exported as JSON Lines.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Severity of a report entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    /// Convert level to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "info" => Ok(Level::Info),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            _ => Err(Error::invalid_level(s)),
        }
    }
}

/// One timestamped report line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Timestamp (UTC)
    pub ts: DateTime<Utc>,
    pub level: Level,
    /// Component that produced the entry, e.g. `creating`
    pub origin: String,
    pub message: String,
}

/// Terminal outcome of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Done,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => f.write_str("done"),
            Outcome::Failed => f.write_str("failed"),
        }
    }
}

/// Append-only report for a build in progress
#[derive(Debug, Clone)]
pub struct BuildReport {
    build_id: String,
    started: DateTime<Utc>,
    entries: Vec<ReportEntry>,
}

impl BuildReport {
    /// Start an empty report
    pub fn new<S: Into<String>>(build_id: S) -> Self {
        Self {
            build_id: build_id.into(),
            started: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Append an entry stamped with the current time
    pub fn record<O: Into<String>, M: Into<String>>(
        &mut self,
        level: Level,
        origin: O,
        message: M,
    ) -> &ReportEntry {
        self.entries.push(ReportEntry {
            ts: Utc::now(),
            level,
            origin: origin.into(),
            message: message.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// Entries recorded so far
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Close the report
    pub fn finalize(self, outcome: Outcome) -> FinalizedReport {
        FinalizedReport {
            build_id: self.build_id,
            started: self.started,
            finished: Utc::now(),
            outcome,
            entries: self.entries,
        }
    }
}

/// Read-only view of a finished build's report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedReport {
    build_id: String,
    started: DateTime<Utc>,
    finished: DateTime<Utc>,
    outcome: Outcome,
    entries: Vec<ReportEntry>,
}

#[derive(Serialize)]
struct JsonlRecord<'a> {
    build: &'a str,
    #[serde(flatten)]
    entry: &'a ReportEntry,
}

impl FinalizedReport {
    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn finished(&self) -> DateTime<Utc> {
        self.finished
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Entries of one level, in recording order
    pub fn by_level(&self, level: Level) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.level == level)
    }

    /// Entries from one origin, in recording order
    pub fn by_origin<'a>(&'a self, origin: &'a str) -> impl Iterator<Item = &'a ReportEntry> {
        self.entries.iter().filter(move |e| e.origin == origin)
    }

    pub fn has_errors(&self) -> bool {
        self.by_level(Level::Error).next().is_some()
    }

    /// Append every entry to `path` as JSON Lines
    ///
    /// Each line carries the build id so reports of several builds can share
    /// one file.
    pub fn write_jsonl<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|_| Error::create_failed(path))?;
        let mut writer = BufWriter::new(file);

        for entry in &self.entries {
            let record = JsonlRecord {
                build: &self.build_id,
                entry,
            };
            writeln!(writer, "{}", serde_json::to_string(&record)?)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Parse a JSON Lines report written by [`FinalizedReport::write_jsonl`]
pub fn parse_report_log<P: AsRef<Path>>(path: P) -> Result<Vec<ReportEntry>> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for (line_num, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let entry: ReportEntry = serde_json::from_str(line)
            .map_err(|e| Error::invalid_entry(line_num + 1, &e.to_string()))?;

        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_level_serialization() {
        let json = serde_json::to_string(&Level::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        assert_eq!(Level::from_str("warn").unwrap(), Level::Warning);
        assert!(Level::from_str("fatal").is_err());
    }

    #[test]
    fn test_record_is_ordered() {
        let mut report = BuildReport::new("b-1");
        report.record(Level::Info, "resolving", "plan ready");
        let last = report.record(Level::Warning, "creating", "overwriting target");
        assert_eq!(last.origin, "creating");
        assert_eq!(report.entries().len(), 2);
        assert!(report.entries()[0].ts <= report.entries()[1].ts);
    }

    #[test]
    fn test_finalize_view() {
        let mut report = BuildReport::new("b-2");
        report.record(Level::Info, "creating", "bag created");
        report.record(Level::Error, "validating", "data/a.txt mismatch");
        let done = report.finalize(Outcome::Failed);

        assert_eq!(done.outcome(), Outcome::Failed);
        assert!(done.has_errors());
        assert_eq!(done.by_level(Level::Info).count(), 1);
        assert_eq!(done.by_origin("validating").count(), 1);
        assert!(done.started() <= done.finished());
    }

    #[test]
    fn test_write_and_parse_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports/build.jsonl");

        let mut report = BuildReport::new("b-3");
        report.record(Level::Info, "amending", "BagIt-Version set to 1.0");
        report.record(Level::Info, "validating", "bag is valid");
        let done = report.finalize(Outcome::Done);
        done.write_jsonl(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().all(|l| l.contains("\"build\":\"b-3\"")));

        let parsed = parse_report_log(&path).unwrap();
        assert_eq!(parsed, done.entries());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();
        let err = parse_report_log(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidEntry { line: 2, .. }));
    }
}
