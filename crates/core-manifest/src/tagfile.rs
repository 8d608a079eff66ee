//! `Label: Value` tag files (`bagit.txt`, `bag-info.txt`)

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Bag declaration file name
pub const BAGIT_TXT: &str = "bagit.txt";
/// Bag metadata file name
pub const BAG_INFO_TXT: &str = "bag-info.txt";

/// Ordered list of tag fields; labels may repeat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFile {
    fields: Vec<(String, String)>,
}

impl TagFile {
    /// Create an empty tag file
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tag file text
    ///
    /// Lines starting with whitespace continue the previous value.
    pub fn parse(file_name: &str, text: &str) -> Result<Self> {
        let mut fields: Vec<(String, String)> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with([' ', '\t']) {
                let (_, value) = fields.last_mut().ok_or_else(|| {
                    Error::malformed(file_name, index + 1, "continuation line without a field")
                })?;
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            let (label, value) = line
                .split_once(':')
                .ok_or_else(|| Error::malformed(file_name, index + 1, "missing ':' separator"))?;
            let label = label.trim();
            if label.is_empty() {
                return Err(Error::malformed(file_name, index + 1, "empty label"));
            }
            fields.push((label.to_string(), value.trim().to_string()));
        }

        Ok(Self { fields })
    }

    /// Read and parse a tag file from disk
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::missing_tag_file(path));
        }
        let text = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::parse(&name, &text)
    }

    /// Serialize, one `Label: Value` line per field
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (label, value) in &self.fields {
            out.push_str(label);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// Write to disk, replacing any previous file
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }

    /// First value for a label
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for a label, in file order
    pub fn get_all(&self, label: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Number of fields carrying a label
    pub fn count(&self, label: &str) -> usize {
        self.fields.iter().filter(|(l, _)| l == label).count()
    }

    /// Whether any field carries a label
    pub fn contains(&self, label: &str) -> bool {
        self.count(label) > 0
    }

    /// Append a field, keeping existing ones with the same label
    pub fn append<L: Into<String>, V: Into<String>>(&mut self, label: L, value: V) {
        self.fields.push((label.into(), value.into()));
    }

    /// Set a single value for a label
    ///
    /// The first existing field keeps its position; other fields with the
    /// same label are dropped. Absent labels are appended.
    pub fn set<L: Into<String>, V: Into<String>>(&mut self, label: L, value: V) {
        let label = label.into();
        let value = value.into();
        match self.fields.iter().position(|(l, _)| *l == label) {
            Some(first) => {
                self.fields[first].1 = value;
                let mut index = 0;
                self.fields.retain(|(l, _)| {
                    let keep = index <= first || *l != label;
                    index += 1;
                    keep
                });
            }
            None => self.fields.push((label, value)),
        }
    }

    /// Remove every field with a label, returning how many were removed
    pub fn remove(&mut self, label: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|(l, _)| l != label);
        before - self.fields.len()
    }

    /// Fields in file order
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

/// Parsed `bagit.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagDeclaration {
    /// `BagIt-Version` value, e.g. `1.0`
    pub version: String,
    /// `Tag-File-Character-Encoding` value
    pub encoding: String,
}

impl BagDeclaration {
    /// Label for the version field
    pub const VERSION_LABEL: &'static str = "BagIt-Version";
    /// Label for the encoding field
    pub const ENCODING_LABEL: &'static str = "Tag-File-Character-Encoding";

    /// Create a declaration
    pub fn new<V: Into<String>, E: Into<String>>(version: V, encoding: E) -> Self {
        Self {
            version: version.into(),
            encoding: encoding.into(),
        }
    }

    /// Read `bagit.txt` from a bag root
    pub fn read(bag_root: &Path) -> Result<Self> {
        let tags = TagFile::read(&bag_root.join(BAGIT_TXT))?;
        Self::from_tags(&tags)
    }

    /// Extract the declaration from parsed fields
    pub fn from_tags(tags: &TagFile) -> Result<Self> {
        let version = tags
            .get(Self::VERSION_LABEL)
            .ok_or_else(|| Error::malformed(BAGIT_TXT, 1, "missing BagIt-Version"))?;
        let encoding = tags
            .get(Self::ENCODING_LABEL)
            .ok_or_else(|| Error::malformed(BAGIT_TXT, 2, "missing Tag-File-Character-Encoding"))?;

        let mut parts = version.split('.');
        let numeric = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(major), Some(minor), None)
                if major.parse::<u32>().is_ok() && minor.parse::<u32>().is_ok()
        );
        if !numeric {
            return Err(Error::malformed(
                BAGIT_TXT,
                1,
                format!("'{}' is not a BagIt version", version),
            ));
        }

        Ok(Self::new(version, encoding))
    }

    /// Serialize as the two-line `bagit.txt`
    pub fn render(&self) -> String {
        format!(
            "{}: {}\n{}: {}\n",
            Self::VERSION_LABEL,
            self.version,
            Self::ENCODING_LABEL,
            self.encoding
        )
    }

    /// Write `bagit.txt` into a bag root
    pub fn write(&self, bag_root: &Path) -> Result<()> {
        fs::write(bag_root.join(BAGIT_TXT), self.render())?;
        Ok(())
    }
}
