/*!
 * bagsmith - BagIt package builder
 *
 * Builds RFC 8493 bags from a payload directory with:
 * - Independent algorithm sets for payload manifests and tag-manifests
 * - Optional metadata directory merged as `meta/`
 * - BagIt 1.0 declaration and `Bagging-DateTime`
 * - Self-validation before the bag is handed back
 * - A per-build report instead of a global logger
 *
 * # Example
 *
 * ```no_run
 * use bagsmith::{build, BuildRequest};
 *
 * let request = BuildRequest::new("/archive/incoming/item-42", "/archive/bags/item-42")
 *     .with_payload_algorithms(["sha256"])
 *     .with_tagmanifest_algorithms(["md5"])
 *     .with_metadata_directory("/archive/incoming/item-42-meta");
 *
 * match build(&request) {
 *     Ok(built) => println!("built {}", built.bag.root().display()),
 *     Err(failure) => eprintln!("{}", failure),
 * }
 * ```
 */

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod request;

// Re-export commonly used types
pub use config::{BagInfoValue, BuilderConfig, LogLevel};
pub use core::{build, AlgorithmPlan, BagBuilder, BuildState, BuiltBag, META_DIR};
pub use error::{BuildError, BuildFailure, Result};
pub use request::{BuildRequest, InformationPackage};

pub use bagsmith_core_audit as audit;
pub use bagsmith_core_manifest as bagit;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
