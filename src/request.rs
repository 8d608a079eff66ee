/*!
 * Build requests and information-package intake
 */

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::BuilderConfig;
use crate::core::META_DIR;
use crate::error::{BuildError, Result};

use bagsmith_core_manifest::{DATA_DIR, DEFAULT_CHECKSUMS};

/// Everything one build needs
///
/// Algorithms are kept as the identifiers the caller supplied; they are
/// checked against the supported set when the build resolves its plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    source_directory: PathBuf,
    target_directory: PathBuf,
    payload_algorithms: Vec<String>,
    tagmanifest_algorithms: Vec<String>,
    metadata_directory: Option<PathBuf>,
    exist_ok: bool,
    bag_info: Vec<(String, String)>,
    workers: usize,
    in_place: bool,
}

impl BuildRequest {
    /// Request with default algorithms (sha256 and sha512 for both roles)
    pub fn new<S: Into<PathBuf>, T: Into<PathBuf>>(source: S, target: T) -> Self {
        let defaults: Vec<String> = DEFAULT_CHECKSUMS.iter().map(|a| a.to_string()).collect();
        Self {
            source_directory: source.into(),
            target_directory: target.into(),
            payload_algorithms: defaults.clone(),
            tagmanifest_algorithms: defaults,
            metadata_directory: None,
            exist_ok: false,
            bag_info: Vec::new(),
            workers: 1,
            in_place: false,
        }
    }

    /// Request populated from a configuration file
    pub fn from_config<S: Into<PathBuf>, T: Into<PathBuf>>(
        config: &BuilderConfig,
        source: S,
        target: T,
    ) -> Self {
        Self::new(source, target).with_config(config)
    }

    /// Take algorithms, workers and bag-info fields from a configuration
    pub fn with_config(self, config: &BuilderConfig) -> Self {
        let mut request = self
            .with_payload_algorithms(config.manifests.iter())
            .with_tagmanifest_algorithms(config.tagmanifests.iter())
            .with_workers(config.workers);
        for (label, value) in &config.bag_info {
            for v in value.values() {
                request = request.with_bag_info(label.as_str(), v);
            }
        }
        request
    }

    pub fn with_payload_algorithms<I, A>(mut self, algorithms: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: ToString,
    {
        self.payload_algorithms = algorithms.into_iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_tagmanifest_algorithms<I, A>(mut self, algorithms: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: ToString,
    {
        self.tagmanifest_algorithms = algorithms.into_iter().map(|a| a.to_string()).collect();
        self
    }

    /// Directory to move into the bag as `meta/`
    pub fn with_metadata_directory<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.metadata_directory = Some(dir.into());
        self
    }

    /// Allow overwriting an existing target directory
    pub fn with_exist_ok(mut self, exist_ok: bool) -> Self {
        self.exist_ok = exist_ok;
        self
    }

    /// Append a `bag-info.txt` field; repeating a label keeps every value
    pub fn with_bag_info<L: Into<String>, V: Into<String>>(mut self, label: L, value: V) -> Self {
        self.bag_info.push((label.into(), value.into()));
        self
    }

    /// Hashing threads; values below one are rejected when the build starts
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn source_directory(&self) -> &Path {
        &self.source_directory
    }

    pub fn target_directory(&self) -> &Path {
        &self.target_directory
    }

    pub fn payload_algorithms(&self) -> &[String] {
        &self.payload_algorithms
    }

    pub fn tagmanifest_algorithms(&self) -> &[String] {
        &self.tagmanifest_algorithms
    }

    pub fn metadata_directory(&self) -> Option<&Path> {
        self.metadata_directory.as_deref()
    }

    pub fn exist_ok(&self) -> bool {
        self.exist_ok
    }

    pub fn bag_info(&self) -> &[(String, String)] {
        &self.bag_info
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether the bag replaces the information package at the target path
    pub fn in_place(&self) -> bool {
        self.in_place
    }
}

/// A directory laid out as `data/` plus an optional `meta/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationPackage {
    root: PathBuf,
    has_meta: bool,
}

impl InformationPackage {
    /// Check the layout of `root`
    ///
    /// Anything besides `data/` and `meta/` is rejected, and the error lists
    /// every offending entry.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(BuildError::configuration(format!(
                "Information package {} is not a directory",
                root.display()
            )));
        }

        let mut has_data = false;
        let mut has_meta = false;
        let mut problematic = Vec::new();

        let entries = fs::read_dir(root).map_err(|e| {
            BuildError::configuration(format!("Cannot read {}: {}", root.display(), e))
        })?;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.path().is_dir();
            match name.as_str() {
                DATA_DIR if is_dir => has_data = true,
                META_DIR if is_dir => has_meta = true,
                _ => problematic.push(name),
            }
        }

        if !problematic.is_empty() {
            problematic.sort();
            return Err(BuildError::configuration(format!(
                "Information package {} may only contain '{}' and '{}'. Problematic content: {}",
                root.display(),
                DATA_DIR,
                META_DIR,
                problematic.join(", ")
            )));
        }
        if !has_data {
            return Err(BuildError::configuration(format!(
                "Information package {} has no '{}' directory",
                root.display(),
                DATA_DIR
            )));
        }

        Ok(Self {
            root: root.to_path_buf(),
            has_meta,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_directory(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn metadata_directory(&self) -> Option<PathBuf> {
        self.has_meta.then(|| self.root.join(META_DIR))
    }

    /// Request building a bag at `target` from this package
    pub fn into_request<T: Into<PathBuf>>(self, target: T) -> BuildRequest {
        let request = BuildRequest::new(self.data_directory(), target);
        match self.metadata_directory() {
            Some(meta) => request.with_metadata_directory(meta),
            None => request,
        }
    }

    /// Request turning this package into a bag at its own path
    ///
    /// The bag is built in a sibling staging directory and swapped in once it
    /// validates; until then the package is left as it is, apart from `meta/`
    /// which the merge moves into the staging bag.
    pub fn into_in_place_request(self) -> BuildRequest {
        let mut request = BuildRequest::new(self.data_directory(), &self.root);
        request.metadata_directory = self.metadata_directory();
        request.in_place = true;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BagInfoValue;
    use tempfile::tempdir;

    #[test]
    fn test_new_uses_default_algorithms() {
        let request = BuildRequest::new("/in", "/out");
        assert_eq!(request.payload_algorithms(), ["sha256", "sha512"]);
        assert_eq!(request.tagmanifest_algorithms(), ["sha256", "sha512"]);
        assert!(!request.exist_ok());
        assert_eq!(request.workers(), 1);
    }

    #[test]
    fn test_builder_methods() {
        use bagsmith_core_manifest::ChecksumAlgorithm;

        let request = BuildRequest::new("/in", "/out")
            .with_payload_algorithms([ChecksumAlgorithm::Sha256])
            .with_tagmanifest_algorithms(["md5"])
            .with_metadata_directory("/meta")
            .with_exist_ok(true)
            .with_bag_info("DC-Creator", "A")
            .with_bag_info("DC-Creator", "B")
            .with_workers(3);

        assert_eq!(request.payload_algorithms(), ["sha256"]);
        assert_eq!(request.tagmanifest_algorithms(), ["md5"]);
        assert_eq!(request.metadata_directory(), Some(Path::new("/meta")));
        assert_eq!(request.bag_info().len(), 2);
        assert_eq!(request.workers(), 3);
    }

    #[test]
    fn test_from_config_expands_lists() {
        let mut config = BuilderConfig {
            manifests: vec!["sha1".into()],
            workers: 2,
            ..Default::default()
        };
        config.bag_info.insert(
            "DC-Creator".into(),
            BagInfoValue::Multiple(vec!["A".into(), "B".into()]),
        );

        let request = BuildRequest::from_config(&config, "/in", "/out");
        assert_eq!(request.payload_algorithms(), ["sha1"]);
        assert_eq!(request.tagmanifest_algorithms(), ["sha256", "sha512"]);
        assert_eq!(request.workers(), 2);
        assert_eq!(
            request.bag_info(),
            [
                ("DC-Creator".to_string(), "A".to_string()),
                ("DC-Creator".to_string(), "B".to_string())
            ]
        );
    }

    #[test]
    fn test_information_package_with_meta() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();

        let ie = InformationPackage::open(dir.path()).unwrap();
        let request = ie.into_request("/out");
        assert_eq!(request.source_directory(), dir.path().join("data"));
        assert_eq!(
            request.metadata_directory(),
            Some(dir.path().join("meta").as_path())
        );
    }

    #[test]
    fn test_in_place_request_targets_package_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();

        let config = BuilderConfig {
            manifests: vec!["md5".into()],
            ..Default::default()
        };
        let request = InformationPackage::open(dir.path())
            .unwrap()
            .into_in_place_request()
            .with_config(&config);

        assert!(request.in_place());
        assert_eq!(request.target_directory(), dir.path());
        assert_eq!(request.source_directory(), dir.path().join("data"));
        assert_eq!(request.payload_algorithms(), ["md5"]);
        assert!(request.metadata_directory().is_some());
        assert!(!BuildRequest::new("/in", "/out").in_place());
    }

    #[test]
    fn test_information_package_without_meta() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        let ie = InformationPackage::open(dir.path()).unwrap();
        assert_eq!(ie.metadata_directory(), None);
    }

    #[test]
    fn test_information_package_lists_problematic_content() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("extra")).unwrap();

        let err = InformationPackage::open(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
        let msg = err.to_string();
        assert!(msg.contains("Problematic content: extra, readme.txt"), "{}", msg);
    }

    #[test]
    fn test_information_package_requires_data() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();
        assert!(InformationPackage::open(dir.path()).is_err());
    }
}
