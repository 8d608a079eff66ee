//! Checksum algorithms accepted in manifest and tag-manifest file names

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::digest::DynDigest;
use std::fmt;
use std::str::FromStr;

/// A checksum algorithm usable for `manifest-<alg>.txt` and `tagmanifest-<alg>.txt`
///
/// The ordering follows declaration order so that sets of algorithms iterate
/// deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5 (legacy compatibility)
    Md5,
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

/// Algorithms used when a caller does not configure any
pub const DEFAULT_CHECKSUMS: [ChecksumAlgorithm; 2] =
    [ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Sha512];

impl ChecksumAlgorithm {
    /// Every supported algorithm, in ordering order
    pub const ALL: [ChecksumAlgorithm; 6] = [
        ChecksumAlgorithm::Md5,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Sha224,
        ChecksumAlgorithm::Sha256,
        ChecksumAlgorithm::Sha384,
        ChecksumAlgorithm::Sha512,
    ];

    /// Name as it appears in manifest file names
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha224 => "sha224",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha384 => "sha384",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }

    /// Length of the hex-encoded digest
    pub fn hex_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::Md5 => 32,
            ChecksumAlgorithm::Sha1 => 40,
            ChecksumAlgorithm::Sha224 => 56,
            ChecksumAlgorithm::Sha256 => 64,
            ChecksumAlgorithm::Sha384 => 96,
            ChecksumAlgorithm::Sha512 => 128,
        }
    }

    /// Payload manifest file name, e.g. `manifest-sha256.txt`
    pub fn manifest_file_name(&self) -> String {
        format!("manifest-{}.txt", self.as_str())
    }

    /// Tag-manifest file name, e.g. `tagmanifest-sha256.txt`
    pub fn tagmanifest_file_name(&self) -> String {
        format!("tagmanifest-{}.txt", self.as_str())
    }

    /// Fresh incremental hasher for this algorithm
    pub(crate) fn hasher(&self) -> Box<dyn DynDigest + Send> {
        match self {
            ChecksumAlgorithm::Md5 => Box::new(md5::Md5::default()),
            ChecksumAlgorithm::Sha1 => Box::new(sha1::Sha1::default()),
            ChecksumAlgorithm::Sha224 => Box::new(sha2::Sha224::default()),
            ChecksumAlgorithm::Sha256 => Box::new(sha2::Sha256::default()),
            ChecksumAlgorithm::Sha384 => Box::new(sha2::Sha384::default()),
            ChecksumAlgorithm::Sha512 => Box::new(sha2::Sha512::default()),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha1" => Ok(ChecksumAlgorithm::Sha1),
            "sha224" => Ok(ChecksumAlgorithm::Sha224),
            "sha256" => Ok(ChecksumAlgorithm::Sha256),
            "sha384" => Ok(ChecksumAlgorithm::Sha384),
            "sha512" => Ok(ChecksumAlgorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Which kind of manifest a file name denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    /// `manifest-<alg>.txt`, lists payload files
    Payload,
    /// `tagmanifest-<alg>.txt`, lists tag files
    Tag,
}

impl ManifestKind {
    /// File name for this kind and algorithm
    pub fn file_name(&self, algorithm: ChecksumAlgorithm) -> String {
        match self {
            ManifestKind::Payload => algorithm.manifest_file_name(),
            ManifestKind::Tag => algorithm.tagmanifest_file_name(),
        }
    }

    /// Recognize a manifest file name in the bag root
    ///
    /// Returns `None` for any other file name, including manifests for
    /// algorithms outside the supported set.
    pub fn classify(file_name: &str) -> Option<(ManifestKind, ChecksumAlgorithm)> {
        let stem = file_name.strip_suffix(".txt")?;
        if let Some(alg) = stem.strip_prefix("tagmanifest-") {
            return alg.parse().ok().map(|a| (ManifestKind::Tag, a));
        }
        if let Some(alg) = stem.strip_prefix("manifest-") {
            return alg.parse().ok().map(|a| (ManifestKind::Payload, a));
        }
        None
    }
}
