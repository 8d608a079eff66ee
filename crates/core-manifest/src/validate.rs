//! Structural and fixity validation of a bag
//!
//! Validation never modifies the bag. Problems found in the bag are collected
//! into a [`Verdict`]; only I/O failures that prevent inspection at all are
//! returned as errors.

use crate::algorithm::{ChecksumAlgorithm, ManifestKind};
use crate::bag::{labels, Bag, PayloadOxum};
use crate::error::Result;
use crate::fsutil::irregular_entries;
use crate::hashing::{hash_files, Digests};
use crate::manifest::Manifest;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// What was found on disk for a listed or unlisted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    /// Checksum of the file as it is now
    Checksum(String),
    /// The file listed in the manifest does not exist
    Missing,
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Checksum(c) => f.write_str(c),
            Observed::Missing => f.write_str("missing"),
        }
    }
}

/// One fixity mismatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Bag-relative path
    pub path: String,
    /// Algorithm of the manifest that disagrees
    pub algorithm: ChecksumAlgorithm,
    /// Checksum recorded in the manifest; `None` when the file is not listed
    pub expected: Option<String>,
    pub actual: Observed,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expected {
            Some(expected) => write!(
                f,
                "{} ({}): expected {}, found {}",
                self.path, self.algorithm, expected, self.actual
            ),
            None => write!(
                f,
                "{} ({}): not listed in manifest, found {}",
                self.path, self.algorithm, self.actual
            ),
        }
    }
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    /// True when there are neither violations nor structural problems
    pub valid: bool,
    /// Fixity mismatches, ordered by path then algorithm
    pub violations: Vec<Violation>,
    /// Structural problems (missing declaration, malformed manifests, ...)
    pub problems: Vec<String>,
}

impl Verdict {
    fn from_findings(mut violations: Vec<Violation>, problems: Vec<String>) -> Self {
        violations.sort_by(|a, b| (&a.path, a.algorithm).cmp(&(&b.path, b.algorithm)));
        Self {
            valid: violations.is_empty() && problems.is_empty(),
            violations,
            problems,
        }
    }

    /// Violations for one path
    pub fn violations_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.path == path)
    }
}

/// Validate a bag
///
/// Checks the declaration, the payload directory, every manifest entry
/// against the file on disk, payload completeness, tag-manifest
/// completeness and `Payload-Oxum`. `workers` controls hashing parallelism.
pub fn validate(bag: &Bag, workers: usize) -> Result<Verdict> {
    let mut problems = Vec::new();
    let mut violations = Vec::new();

    if let Err(e) = bag.declaration() {
        problems.push(format!("bagit.txt: {}", e));
    }
    if !bag.data_dir().is_dir() {
        problems.push("payload directory data/ is missing".to_string());
    }
    for path in irregular_entries(bag.root())? {
        problems.push(format!("{}: not a regular file or directory", path));
    }

    let payload_algs = bag.payload_algorithms()?;
    if payload_algs.is_empty() {
        problems.push("no payload manifest found".to_string());
    }
    let payload_manifests = load_manifests(bag, ManifestKind::Payload, &payload_algs, &mut problems);
    let payload_files = bag.payload_files()?;
    check_kind(
        bag,
        &payload_manifests,
        &payload_files,
        workers,
        &mut violations,
    )?;

    let tag_algs = bag.tag_algorithms()?;
    let tag_manifests = load_manifests(bag, ManifestKind::Tag, &tag_algs, &mut problems);
    let tag_files = bag.tag_files()?;
    check_kind(bag, &tag_manifests, &tag_files, workers, &mut violations)?;

    check_oxum(bag, &mut problems)?;

    Ok(Verdict::from_findings(violations, problems))
}

fn load_manifests(
    bag: &Bag,
    kind: ManifestKind,
    algorithms: &BTreeSet<ChecksumAlgorithm>,
    problems: &mut Vec<String>,
) -> Vec<Manifest> {
    let mut manifests = Vec::new();
    for &alg in algorithms {
        match bag.read_manifest(kind, alg) {
            Ok(m) => manifests.push(m),
            Err(e) => problems.push(e.to_string()),
        }
    }
    manifests
}

/// Compare manifests of one kind against the files that should be listed
///
/// Every file is read once, hashed with all algorithms of the loaded
/// manifests.
fn check_kind(
    bag: &Bag,
    manifests: &[Manifest],
    expected_files: &[String],
    workers: usize,
    violations: &mut Vec<Violation>,
) -> Result<()> {
    if manifests.is_empty() {
        return Ok(());
    }

    let algorithms: Vec<ChecksumAlgorithm> = manifests.iter().map(Manifest::algorithm).collect();
    let mut to_hash: BTreeSet<String> = expected_files.iter().cloned().collect();
    for manifest in manifests {
        for path in manifest.paths() {
            if bag.root().join(path).is_file() {
                to_hash.insert(path.to_string());
            }
        }
    }
    let to_hash: Vec<String> = to_hash.into_iter().collect();
    let observed: BTreeMap<String, Digests> = hash_files(bag.root(), &to_hash, &algorithms, workers)?
        .into_iter()
        .collect();

    for manifest in manifests {
        let alg = manifest.algorithm();
        for entry in manifest.entries() {
            let actual = match observed.get(&entry.relative_path).and_then(|d| d.get(&alg)) {
                Some(actual) if *actual == entry.checksum => continue,
                Some(actual) => Observed::Checksum(actual.clone()),
                None => Observed::Missing,
            };
            violations.push(Violation {
                path: entry.relative_path,
                algorithm: alg,
                expected: Some(entry.checksum),
                actual,
            });
        }

        for path in expected_files {
            if manifest.contains(path) {
                continue;
            }
            if let Some(actual) = observed.get(path).and_then(|d| d.get(&alg)) {
                violations.push(Violation {
                    path: path.clone(),
                    algorithm: alg,
                    expected: None,
                    actual: Observed::Checksum(actual.clone()),
                });
            }
        }
    }

    Ok(())
}

fn check_oxum(bag: &Bag, problems: &mut Vec<String>) -> Result<()> {
    let info = match bag.bag_info() {
        Ok(info) => info,
        Err(_) => return Ok(()),
    };
    let declared = match info.get(labels::PAYLOAD_OXUM) {
        Some(value) => value,
        None => return Ok(()),
    };

    match declared.parse::<PayloadOxum>() {
        Ok(declared) => {
            let actual = bag.payload_oxum()?;
            if declared != actual {
                problems.push(format!(
                    "Payload-Oxum mismatch: declared {}, found {}",
                    declared, actual
                ));
            }
        }
        Err(e) => problems.push(e.to_string()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::CreateOptions;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn build(root: &Path, algs: &[ChecksumAlgorithm]) -> Bag {
        let source = root.join("source");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("a.txt"), b"alpha").unwrap();
        fs::write(source.join("nested/b.txt"), b"bravo").unwrap();
        Bag::create(&source, &root.join("bag"), algs, &CreateOptions::default()).unwrap()
    }

    #[test]
    fn test_fresh_bag_is_valid() {
        let temp = tempdir().unwrap();
        let bag = build(temp.path(), &[ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Sha512]);
        let verdict = validate(&bag, 1).unwrap();
        assert!(verdict.valid, "{:?}", verdict);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn test_modified_payload_is_reported() {
        let temp = tempdir().unwrap();
        let bag = build(temp.path(), &[ChecksumAlgorithm::Sha256]);
        fs::write(bag.root().join("data/a.txt"), b"tampered").unwrap();

        let verdict = validate(&bag, 2).unwrap();
        assert!(!verdict.valid);
        let found: Vec<_> = verdict.violations_for("data/a.txt").collect();
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0].actual, Observed::Checksum(_)));
    }

    #[test]
    fn test_missing_payload_file_is_reported() {
        let temp = tempdir().unwrap();
        let bag = build(temp.path(), &[ChecksumAlgorithm::Md5]);
        fs::remove_file(bag.root().join("data/nested/b.txt")).unwrap();

        let verdict = validate(&bag, 1).unwrap();
        assert!(!verdict.valid);
        let found: Vec<_> = verdict.violations_for("data/nested/b.txt").collect();
        assert_eq!(found[0].actual, Observed::Missing);
        assert!(verdict.problems.iter().any(|p| p.contains("Payload-Oxum")));
    }

    #[test]
    fn test_unlisted_payload_file_is_reported() {
        let temp = tempdir().unwrap();
        let bag = build(temp.path(), &[ChecksumAlgorithm::Sha1]);
        fs::write(bag.root().join("data/extra.txt"), b"").unwrap();

        let verdict = validate(&bag, 1).unwrap();
        let found: Vec<_> = verdict.violations_for("data/extra.txt").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].expected, None);
    }

    #[test]
    fn test_corrupted_manifest_checksum_is_reported() {
        let temp = tempdir().unwrap();
        let bag = build(temp.path(), &[ChecksumAlgorithm::Sha256]);
        let mut manifest = bag
            .read_manifest(ManifestKind::Payload, ChecksumAlgorithm::Sha256)
            .unwrap();
        manifest.insert("data/a.txt", "0".repeat(64));
        manifest.write(bag.root()).unwrap();

        let verdict = validate(&bag, 1).unwrap();
        assert!(!verdict.valid);
        let paths: Vec<&str> = verdict.violations.iter().map(|v| v.path.as_str()).collect();
        assert!(paths.contains(&"data/a.txt"));
        // The rewritten manifest no longer matches its tag-manifest entry either
        assert!(paths.contains(&"manifest-sha256.txt"));
    }

    #[test]
    fn test_missing_declaration_is_a_problem() {
        let temp = tempdir().unwrap();
        let bag = build(temp.path(), &[ChecksumAlgorithm::Sha256]);
        fs::write(bag.root().join("bagit.txt"), "garbage\n").unwrap();

        let verdict = validate(&bag, 1).unwrap();
        assert!(!verdict.valid);
        assert!(verdict.problems.iter().any(|p| p.starts_with("bagit.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_tag_directory_is_a_problem() {
        let temp = tempdir().unwrap();
        let mut bag = build(temp.path(), &[ChecksumAlgorithm::Sha256]);
        let outside = temp.path().join("real-meta");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("mets.xml"), b"<mets/>").unwrap();
        std::os::unix::fs::symlink(&outside, bag.root().join("meta")).unwrap();
        bag.regenerate_tag_manifests(&[ChecksumAlgorithm::Sha256], 1).unwrap();

        let verdict = validate(&bag, 1).unwrap();
        assert!(!verdict.valid);
        assert!(verdict
            .problems
            .iter()
            .any(|p| p == "meta: not a regular file or directory"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_tag_file_is_a_problem() {
        let temp = tempdir().unwrap();
        let mut bag = build(temp.path(), &[ChecksumAlgorithm::Md5]);
        let outside = temp.path().join("premis.xml");
        fs::write(&outside, b"<premis/>").unwrap();
        fs::create_dir_all(bag.root().join("meta")).unwrap();
        fs::write(bag.root().join("meta/mets.xml"), b"<mets/>").unwrap();
        std::os::unix::fs::symlink(&outside, bag.root().join("meta/premis.xml")).unwrap();
        bag.regenerate_tag_manifests(&[ChecksumAlgorithm::Md5], 1).unwrap();

        let verdict = validate(&bag, 1).unwrap();
        assert!(!verdict.valid);
        assert!(verdict
            .problems
            .iter()
            .any(|p| p.starts_with("meta/premis.xml")));
    }

    #[test]
    fn test_violation_display() {
        let v = Violation {
            path: "data/a.txt".into(),
            algorithm: ChecksumAlgorithm::Md5,
            expected: Some("aa".into()),
            actual: Observed::Missing,
        };
        assert_eq!(v.to_string(), "data/a.txt (md5): expected aa, found missing");
    }
}
