/*!
 * Configuration types for bagsmith
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bagsmith_core_manifest::DEFAULT_CHECKSUMS;

use crate::error::{BuildError, Result};

/// Builder configuration, usually loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Payload manifest algorithms
    #[serde(default = "default_checksums")]
    pub manifests: Vec<String>,

    /// Tag-manifest algorithms
    #[serde(default = "default_checksums")]
    pub tagmanifests: Vec<String>,

    /// Hashing threads per build
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (JSON output); stdout when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Where to append the build report as JSON Lines
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Extra `bag-info.txt` fields
    #[serde(default)]
    pub bag_info: BTreeMap<String, BagInfoValue>,
}

fn default_checksums() -> Vec<String> {
    DEFAULT_CHECKSUMS.iter().map(|a| a.to_string()).collect()
}

fn default_workers() -> usize {
    1
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            manifests: default_checksums(),
            tagmanifests: default_checksums(),
            workers: default_workers(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            report_path: None,
            bag_info: BTreeMap::new(),
        }
    }
}

impl BuilderConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BuildError::configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            BuildError::configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BuildError::configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// A `bag-info.txt` value: one string, or several written as repeated labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BagInfoValue {
    Single(String),
    Multiple(Vec<String>),
}

impl BagInfoValue {
    /// Values in write order
    pub fn values(&self) -> Vec<&str> {
        match self {
            BagInfoValue::Single(v) => vec![v.as_str()],
            BagInfoValue::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
