/*!
 * Base bag creation for the algorithm superset
 */

use std::path::Path;

use chrono::{DateTime, Local};
use tracing::debug;

use bagsmith_core_manifest::{Bag, CreateOptions, TagFile};

use super::fs_ops;
use super::journal::Journal;
use super::plan::AlgorithmPlan;
use crate::error::Result;
use crate::request::BuildRequest;

const ORIGIN: &str = "creating";

/// Freshly created bag plus the moment the build captured as its bagging time
#[derive(Debug)]
pub struct BasePackage {
    pub bag: Bag,
    pub captured_at: DateTime<Local>,
}

/// Create the bag at `target` with every superset algorithm
///
/// `target` is the request's target, or a staging directory for in-place
/// builds. With `exist_ok` an existing target is removed first. The capture
/// time is taken once, before anything is written.
pub fn create_base(
    request: &BuildRequest,
    target: &Path,
    plan: &AlgorithmPlan,
    journal: &mut Journal,
) -> Result<BasePackage> {
    let captured_at = Local::now();

    if request.exist_ok() && target.exists() {
        journal.warning(
            ORIGIN,
            format!("overwriting existing target {}", target.display()),
        );
        fs_ops::clear_dir(target)?;
    }

    let mut bag_info = TagFile::new();
    for (label, value) in request.bag_info() {
        bag_info.append(label.as_str(), value.as_str());
    }

    let options = CreateOptions {
        bag_info,
        bagging_date: captured_at.date_naive(),
        workers: request.workers(),
        ..CreateOptions::default()
    };

    let algorithms = plan.superset_list();
    debug!(
        "creating bag {} from {} with {:?}",
        target.display(),
        request.source_directory().display(),
        algorithms
    );
    let bag = Bag::create(request.source_directory(), target, &algorithms, &options)?;

    let oxum = bag.payload_oxum()?;
    journal.info(
        ORIGIN,
        format!(
            "created bag at {} ({} payload files, {} bytes) with {}",
            target.display(),
            oxum.streams,
            oxum.octets,
            algorithms
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    );

    Ok(BasePackage { bag, captured_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use bagsmith_core_manifest::{ChecksumAlgorithm, ManifestKind};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_creates_superset_manifests() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("in");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"a").unwrap();

        let request = BuildRequest::new(&source, temp.path().join("bag"))
            .with_payload_algorithms(["sha256"])
            .with_tagmanifest_algorithms(["md5"])
            .with_bag_info("Contact-Name", "Archivist");
        let plan = AlgorithmPlan::resolve(request.payload_algorithms(), request.tagmanifest_algorithms())
            .unwrap();
        let mut journal = Journal::new("t");

        let base = create_base(&request, request.target_directory(), &plan, &mut journal).unwrap();
        for alg in [ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha256] {
            assert!(base.bag.has_manifest(ManifestKind::Payload, alg));
            assert!(base.bag.has_manifest(ManifestKind::Tag, alg));
        }
        let info = base.bag.bag_info().unwrap();
        assert_eq!(info.get("Contact-Name"), Some("Archivist"));
        assert_eq!(
            info.get("Bagging-Date"),
            Some(base.captured_at.format("%Y-%m-%d").to_string().as_str())
        );
    }

    #[test]
    fn test_exist_ok_replaces_target() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("in");
        let target = temp.path().join("bag");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"a").unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), b"old").unwrap();

        let request = BuildRequest::new(&source, &target).with_exist_ok(true);
        let plan = AlgorithmPlan::resolve(request.payload_algorithms(), request.tagmanifest_algorithms())
            .unwrap();
        let mut journal = Journal::new("t");

        create_base(&request, request.target_directory(), &plan, &mut journal).unwrap();
        assert!(!target.join("stale.txt").exists());
        assert!(target.join("data/a.txt").exists());
    }

    #[test]
    fn test_missing_source_is_packaging_error() {
        let temp = tempdir().unwrap();
        let request = BuildRequest::new(temp.path().join("absent"), temp.path().join("bag"));
        let plan = AlgorithmPlan::resolve(&["md5"], &["md5"]).unwrap();
        let mut journal = Journal::new("t");

        let err = create_base(&request, request.target_directory(), &plan, &mut journal).unwrap_err();
        assert!(matches!(err, BuildError::Packaging(_)));
    }
}
