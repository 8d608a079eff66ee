//! On-disk bags: creation from a source tree and access to an existing bag
//!
//! [`Bag::create`] produces a complete bag for a single set of algorithms:
//! one payload manifest and one tag-manifest per algorithm. Anything more
//! selective is left to callers, which can remove or regenerate individual
//! manifests through the methods on [`Bag`].

use crate::algorithm::{ChecksumAlgorithm, ManifestKind};
use crate::error::{Error, Result};
use crate::fsutil::{copy_tree, list_files, summarize_tree};
use crate::hashing::hash_files;
use crate::manifest::Manifest;
use crate::tagfile::{BagDeclaration, TagFile, BAG_INFO_TXT, BAGIT_TXT};
use chrono::{Local, NaiveDate};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Payload directory name inside a bag
pub const DATA_DIR: &str = "data";

/// `BagIt-Version` written by [`Bag::create`]
pub const CREATED_BAGIT_VERSION: &str = "0.97";

/// Tag file character encoding
pub const TAG_FILE_ENCODING: &str = "UTF-8";

/// Well-known `bag-info.txt` labels
pub mod labels {
    pub const BAGGING_DATE: &str = "Bagging-Date";
    pub const BAGGING_DATETIME: &str = "Bagging-DateTime";
    pub const PAYLOAD_OXUM: &str = "Payload-Oxum";
    pub const BAG_SOFTWARE_AGENT: &str = "Bag-Software-Agent";
}

/// Options for [`Bag::create`]
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Caller-supplied `bag-info.txt` fields, written first and in order
    pub bag_info: TagFile,
    /// Value for `Bagging-Date` when the caller did not supply one
    pub bagging_date: NaiveDate,
    /// Hashing threads; `1` hashes on the calling thread
    pub workers: usize,
    /// Value for `Bag-Software-Agent` when the caller did not supply one
    pub software_agent: String,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            bag_info: TagFile::new(),
            bagging_date: Local::now().date_naive(),
            workers: 1,
            software_agent: format!("bagsmith v{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// `Payload-Oxum`: total payload octets and file count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadOxum {
    pub octets: u64,
    pub streams: u64,
}

impl fmt::Display for PayloadOxum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.octets, self.streams)
    }
}

impl FromStr for PayloadOxum {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::malformed(BAG_INFO_TXT, 0, format!("'{}' is not a Payload-Oxum", s));
        let (octets, streams) = s.trim().split_once('.').ok_or_else(bad)?;
        Ok(Self {
            octets: octets.parse().map_err(|_| bad())?,
            streams: streams.parse().map_err(|_| bad())?,
        })
    }
}

/// Handle to a bag directory
#[derive(Debug, Clone)]
pub struct Bag {
    root: PathBuf,
    tag_manifests_stale: bool,
}

impl Bag {
    /// Build a bag at `target` from the contents of `source`
    ///
    /// `target` must be absent or empty. The source tree is copied into
    /// `target/data` and left untouched.
    pub fn create(
        source: &Path,
        target: &Path,
        algorithms: &[ChecksumAlgorithm],
        options: &CreateOptions,
    ) -> Result<Bag> {
        if algorithms.is_empty() {
            return Err(Error::NoAlgorithms);
        }
        if !source.is_dir() {
            return Err(Error::SourceNotFound {
                path: source.to_path_buf(),
            });
        }
        if summarize_tree(source)?.files == 0 {
            return Err(Error::EmptySource {
                path: source.to_path_buf(),
            });
        }
        if target.exists() && fs::read_dir(target)?.next().is_some() {
            return Err(Error::TargetNotEmpty {
                path: target.to_path_buf(),
            });
        }

        fs::create_dir_all(target)?;
        let copied = copy_tree(source, &target.join(DATA_DIR))?;

        let mut bag = Bag {
            root: target.to_path_buf(),
            tag_manifests_stale: false,
        };

        BagDeclaration::new(CREATED_BAGIT_VERSION, TAG_FILE_ENCODING).write(&bag.root)?;

        let payload = bag.payload_files()?;
        let digests = hash_files(&bag.root, &payload, algorithms, options.workers)?;
        for &alg in algorithms {
            let mut manifest = Manifest::new(ManifestKind::Payload, alg);
            for (path, file_digests) in &digests {
                if let Some(checksum) = file_digests.get(&alg) {
                    manifest.insert(path.as_str(), checksum.as_str());
                }
            }
            manifest.write(&bag.root)?;
        }

        let mut info = options.bag_info.clone();
        if !info.contains(labels::BAGGING_DATE) {
            info.set(
                labels::BAGGING_DATE,
                options.bagging_date.format("%Y-%m-%d").to_string(),
            );
        }
        if !info.contains(labels::BAG_SOFTWARE_AGENT) {
            info.set(labels::BAG_SOFTWARE_AGENT, options.software_agent.as_str());
        }
        let oxum = PayloadOxum {
            octets: copied.bytes,
            streams: copied.files,
        };
        info.set(labels::PAYLOAD_OXUM, oxum.to_string());
        bag.write_bag_info(&info)?;

        bag.regenerate_tag_manifests(algorithms, options.workers)?;
        Ok(bag)
    }

    /// Open an existing bag
    pub fn open(root: &Path) -> Result<Bag> {
        if !root.join(BAGIT_TXT).is_file() {
            return Err(Error::missing_tag_file(root.join(BAGIT_TXT)));
        }
        Ok(Bag {
            root: root.to_path_buf(),
            tag_manifests_stale: false,
        })
    }

    /// Bag root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Payload directory
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn declaration(&self) -> Result<BagDeclaration> {
        BagDeclaration::read(&self.root)
    }

    /// Rewrite `bagit.txt`; tag-manifests become stale
    pub fn write_declaration(&mut self, declaration: &BagDeclaration) -> Result<()> {
        declaration.write(&self.root)?;
        self.tag_manifests_stale = true;
        Ok(())
    }

    pub fn bag_info(&self) -> Result<TagFile> {
        TagFile::read(&self.root.join(BAG_INFO_TXT))
    }

    /// Rewrite `bag-info.txt`; tag-manifests become stale
    pub fn write_bag_info(&mut self, info: &TagFile) -> Result<()> {
        info.write(&self.root.join(BAG_INFO_TXT))?;
        self.tag_manifests_stale = true;
        Ok(())
    }

    /// Record that tag files changed without regenerating tag-manifests
    pub fn mark_tag_manifests_stale(&mut self) {
        self.tag_manifests_stale = true;
    }

    /// Whether tag files changed since the tag-manifests were last written
    pub fn tag_manifests_stale(&self) -> bool {
        self.tag_manifests_stale
    }

    /// Algorithms that have a manifest file of the given kind
    pub fn manifest_algorithms(&self, kind: ManifestKind) -> Result<BTreeSet<ChecksumAlgorithm>> {
        let mut found = BTreeSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some((k, alg)) = name.to_str().and_then(ManifestKind::classify) {
                if k == kind {
                    found.insert(alg);
                }
            }
        }
        Ok(found)
    }

    /// Algorithms with a `manifest-<alg>.txt`
    pub fn payload_algorithms(&self) -> Result<BTreeSet<ChecksumAlgorithm>> {
        self.manifest_algorithms(ManifestKind::Payload)
    }

    /// Algorithms with a `tagmanifest-<alg>.txt`
    pub fn tag_algorithms(&self) -> Result<BTreeSet<ChecksumAlgorithm>> {
        self.manifest_algorithms(ManifestKind::Tag)
    }

    /// Whether the manifest file exists
    pub fn has_manifest(&self, kind: ManifestKind, algorithm: ChecksumAlgorithm) -> bool {
        self.root.join(kind.file_name(algorithm)).is_file()
    }

    pub fn read_manifest(&self, kind: ManifestKind, algorithm: ChecksumAlgorithm) -> Result<Manifest> {
        Manifest::read(&self.root, kind, algorithm)
    }

    /// Delete one manifest file
    ///
    /// Removing a payload manifest changes the tag file set, so the
    /// tag-manifests become stale.
    pub fn remove_manifest(&mut self, kind: ManifestKind, algorithm: ChecksumAlgorithm) -> Result<()> {
        let path = self.root.join(kind.file_name(algorithm));
        if !path.is_file() {
            return Err(Error::missing_tag_file(path));
        }
        fs::remove_file(&path)?;
        if kind == ManifestKind::Payload {
            self.tag_manifests_stale = true;
        }
        Ok(())
    }

    /// Payload files as bag paths (`data/...`), sorted
    pub fn payload_files(&self) -> Result<Vec<String>> {
        if !self.data_dir().is_dir() {
            return Ok(Vec::new());
        }
        list_files(&self.root, Path::new(DATA_DIR))
    }

    /// Every file outside `data/` except tag-manifests, sorted
    pub fn tag_files(&self) -> Result<Vec<String>> {
        let payload_prefix = format!("{}/", DATA_DIR);
        Ok(list_files(&self.root, Path::new(""))?
            .into_iter()
            .filter(|p| !p.starts_with(&payload_prefix))
            .filter(|p| p.contains('/') || !p.starts_with("tagmanifest-"))
            .collect())
    }

    /// Rewrite the tag-manifest of every given algorithm from scratch
    ///
    /// Tag-manifests of other algorithms are left as they are.
    pub fn regenerate_tag_manifests(
        &mut self,
        algorithms: &[ChecksumAlgorithm],
        workers: usize,
    ) -> Result<()> {
        let tag_files = self.tag_files()?;
        let digests = hash_files(&self.root, &tag_files, algorithms, workers)?;

        for &alg in algorithms {
            let mut manifest = Manifest::new(ManifestKind::Tag, alg);
            for (path, file_digests) in &digests {
                if let Some(checksum) = file_digests.get(&alg) {
                    manifest.insert(path.as_str(), checksum.as_str());
                }
            }
            manifest.write(&self.root)?;
        }

        self.tag_manifests_stale = false;
        Ok(())
    }

    /// Compute `Payload-Oxum` from the files currently under `data/`
    pub fn payload_oxum(&self) -> Result<PayloadOxum> {
        if !self.data_dir().is_dir() {
            return Ok(PayloadOxum {
                octets: 0,
                streams: 0,
            });
        }
        let summary = summarize_tree(&self.data_dir())?;
        Ok(PayloadOxum {
            octets: summary.bytes,
            streams: summary.files,
        })
    }
}
