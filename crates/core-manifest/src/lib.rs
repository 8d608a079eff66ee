//! BagIt packaging primitive for bagsmith
//!
//! This crate knows how to create, read, rewrite and validate bags as
//! described by RFC 8493. It has no notion of asymmetric algorithm sets or
//! build stages; those live in the `bagsmith` crate.
//!
//! # Key Concepts
//!
//! - **Payload manifest**: `manifest-<alg>.txt`, checksums of every file under `data/`
//! - **Tag-manifest**: `tagmanifest-<alg>.txt`, checksums of every other file
//! - **Tag file**: `Label: Value` files such as `bagit.txt` and `bag-info.txt`
//!
//! # Example
//!
//! ```no_run
//! use bagsmith_core_manifest::{validate, Bag, ChecksumAlgorithm, CreateOptions};
//! use std::path::Path;
//!
//! let bag = Bag::create(
//!     Path::new("/data/source"),
//!     Path::new("/data/bag"),
//!     &[ChecksumAlgorithm::Sha256],
//!     &CreateOptions::default(),
//! )?;
//! assert!(validate(&bag, 1)?.valid);
//! # Ok::<(), bagsmith_core_manifest::Error>(())
//! ```

pub mod algorithm;
pub mod bag;
pub mod error;
pub mod fsutil;
pub mod hashing;
pub mod manifest;
pub mod tagfile;
pub mod validate;

// Re-export main types for convenience
pub use algorithm::{ChecksumAlgorithm, ManifestKind, DEFAULT_CHECKSUMS};
pub use bag::{labels, Bag, CreateOptions, PayloadOxum, DATA_DIR};
pub use error::{Error, Result};
pub use fsutil::{irregular_entries, TreeSummary};
pub use hashing::{hash_file, hash_files, Digests, MultiHasher};
pub use manifest::{Manifest, ManifestEntry};
pub use tagfile::{BagDeclaration, TagFile, BAGIT_TXT, BAG_INFO_TXT};
pub use validate::{validate, Observed, Verdict, Violation};

/// BagIt version this crate declares once a bag is finished
pub const BAGIT_VERSION: &str = "1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bagit_version() {
        assert_eq!(BAGIT_VERSION, "1.0");
        assert_ne!(BAGIT_VERSION, bag::CREATED_BAGIT_VERSION);
    }
}
