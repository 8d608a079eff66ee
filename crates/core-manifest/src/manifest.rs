//! Payload manifests and tag-manifests
//!
//! A manifest file holds one line per file: the hex checksum, whitespace, and
//! the bag-relative path. Paths containing CR, LF or `%` are percent-encoded.

use crate::algorithm::{ChecksumAlgorithm, ManifestKind};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A single manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Bag-relative path with `/` separators
    pub relative_path: String,
    /// Lowercase hex checksum
    pub checksum: String,
    /// Algorithm the checksum was computed with
    pub algorithm: ChecksumAlgorithm,
}

/// In-memory form of one `manifest-<alg>.txt` or `tagmanifest-<alg>.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    kind: ManifestKind,
    algorithm: ChecksumAlgorithm,
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new(kind: ManifestKind, algorithm: ChecksumAlgorithm) -> Self {
        Self {
            kind,
            algorithm,
            entries: BTreeMap::new(),
        }
    }

    /// Kind of manifest
    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    /// Algorithm of every checksum in this manifest
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// File name inside the bag root
    pub fn file_name(&self) -> String {
        self.kind.file_name(self.algorithm)
    }

    /// Add or replace the checksum for a path
    pub fn insert<P: Into<String>, C: Into<String>>(&mut self, path: P, checksum: C) {
        self.entries
            .insert(path.into(), checksum.into().to_ascii_lowercase());
    }

    /// Checksum recorded for a path
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Whether a path is listed
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are listed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listed paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in path order
    pub fn entries(&self) -> impl Iterator<Item = ManifestEntry> + '_ {
        self.entries.iter().map(move |(path, checksum)| ManifestEntry {
            relative_path: path.clone(),
            checksum: checksum.clone(),
            algorithm: self.algorithm,
        })
    }

    /// Parse manifest text
    pub fn parse(kind: ManifestKind, algorithm: ChecksumAlgorithm, text: &str) -> Result<Self> {
        let file_name = kind.file_name(algorithm);
        let mut manifest = Self::new(kind, algorithm);

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let (checksum, path) = line
                .split_once(|c: char| c == ' ' || c == '\t')
                .ok_or_else(|| Error::malformed(&file_name, index + 1, "expected '<checksum> <path>'"))?;
            let path = path.trim_start_matches([' ', '\t']);

            if checksum.len() != algorithm.hex_len()
                || !checksum.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(Error::malformed(
                    &file_name,
                    index + 1,
                    format!("'{}' is not a {} checksum", checksum, algorithm),
                ));
            }
            if path.is_empty() {
                return Err(Error::malformed(&file_name, index + 1, "empty path"));
            }

            let decoded = decode_path(path);
            if manifest.contains(&decoded) {
                return Err(Error::malformed(
                    &file_name,
                    index + 1,
                    format!("duplicate entry for '{}'", decoded),
                ));
            }
            manifest.insert(decoded, checksum);
        }

        Ok(manifest)
    }

    /// Serialize to manifest text, one line per entry in path order
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (path, checksum) in &self.entries {
            out.push_str(checksum);
            out.push_str("  ");
            out.push_str(&encode_path(path));
            out.push('\n');
        }
        out
    }

    /// Read a manifest from a bag root
    pub fn read(bag_root: &Path, kind: ManifestKind, algorithm: ChecksumAlgorithm) -> Result<Self> {
        let text = fs::read_to_string(bag_root.join(kind.file_name(algorithm)))?;
        Self::parse(kind, algorithm, &text)
    }

    /// Write this manifest into a bag root, replacing any previous file
    pub fn write(&self, bag_root: &Path) -> Result<()> {
        fs::write(bag_root.join(self.file_name()), self.render())?;
        Ok(())
    }
}

/// Percent-encode the characters a manifest line cannot carry verbatim
pub fn encode_path(path: &str) -> String {
    path.replace('%', "%25")
        .replace('\n', "%0A")
        .replace('\r', "%0D")
}

/// Reverse [`encode_path`]
pub fn decode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos..pos + 3).map(str::to_ascii_uppercase);
        match escape.as_deref() {
            Some("%25") => out.push('%'),
            Some("%0A") => out.push('\n'),
            Some("%0D") => out.push('\r'),
            _ => {
                out.push('%');
                rest = &rest[pos + 1..];
                continue;
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    out
}
