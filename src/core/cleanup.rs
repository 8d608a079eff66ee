/*!
 * Removal of manifests that belong to only one role
 */

use std::collections::BTreeSet;

use bagsmith_core_manifest::{Bag, ChecksumAlgorithm, ManifestKind};

use super::journal::Journal;
use super::plan::AlgorithmPlan;
use crate::error::{BuildError, Result};

const ORIGIN: &str = "cleaning";

/// Bring the manifest files in line with the plan
///
/// A bag whose manifest sets already match the plan is left alone, so
/// running this twice is harmless. Otherwise every manifest scheduled for
/// removal must exist. Tag-manifests are rewritten once payload manifests
/// are gone, since those were tag files.
pub fn clean(
    bag: &mut Bag,
    plan: &AlgorithmPlan,
    workers: usize,
    journal: &mut Journal,
) -> Result<()> {
    let want_payload = plan.payload_algorithms();
    let want_tag = plan.tag_algorithms();

    if bag.payload_algorithms()? == want_payload && bag.tag_algorithms()? == want_tag {
        journal.info(ORIGIN, "manifest sets already match, nothing to remove");
        return Ok(());
    }

    for &alg in &plan.payload_only {
        remove(bag, ManifestKind::Tag, alg, journal)?;
    }
    for &alg in &plan.tag_only {
        remove(bag, ManifestKind::Payload, alg, journal)?;
    }

    if bag.tag_manifests_stale() {
        bag.regenerate_tag_manifests(&plan.tag_list(), workers)?;
        journal.info(ORIGIN, "tag-manifests regenerated");
    }

    check_sets(bag, ManifestKind::Payload, &want_payload)?;
    check_sets(bag, ManifestKind::Tag, &want_tag)?;
    Ok(())
}

fn remove(
    bag: &mut Bag,
    kind: ManifestKind,
    alg: ChecksumAlgorithm,
    journal: &mut Journal,
) -> Result<()> {
    let name = kind.file_name(alg);
    if !bag.has_manifest(kind, alg) {
        return Err(BuildError::consistency(format!(
            "{} was expected for cleanup but does not exist",
            name
        )));
    }
    bag.remove_manifest(kind, alg)?;
    journal.info(ORIGIN, format!("removed {}", name));
    Ok(())
}

fn check_sets(
    bag: &Bag,
    kind: ManifestKind,
    expected: &BTreeSet<ChecksumAlgorithm>,
) -> Result<()> {
    let actual = bag.manifest_algorithms(kind)?;
    if actual != *expected {
        return Err(BuildError::consistency(format!(
            "{:?} manifests after cleanup are {:?}, expected {:?}",
            kind, actual, expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagsmith_core_manifest::CreateOptions;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn superset_bag(root: &Path, plan: &AlgorithmPlan) -> Bag {
        let source = root.join("in");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"a").unwrap();
        Bag::create(&source, &root.join("bag"), &plan.superset_list(), &CreateOptions::default())
            .unwrap()
    }

    fn names(bag: &Bag) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(bag.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.contains("manifest-"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_asymmetric_cleanup() {
        let temp = tempdir().unwrap();
        let plan = AlgorithmPlan::resolve(&["sha256"], &["md5"]).unwrap();
        let mut bag = superset_bag(temp.path(), &plan);

        clean(&mut bag, &plan, 1, &mut Journal::new("t")).unwrap();

        assert_eq!(names(&bag), vec!["manifest-sha256.txt", "tagmanifest-md5.txt"]);
        let tags = bag.read_manifest(ManifestKind::Tag, ChecksumAlgorithm::Md5).unwrap();
        let listed: Vec<&str> = tags.paths().collect();
        assert_eq!(listed, vec!["bag-info.txt", "bagit.txt", "manifest-sha256.txt"]);
    }

    #[test]
    fn test_equal_sets_are_a_no_op() {
        let temp = tempdir().unwrap();
        let plan = AlgorithmPlan::resolve(&["sha1", "sha256"], &["sha256", "sha1"]).unwrap();
        let mut bag = superset_bag(temp.path(), &plan);
        let before = names(&bag);

        clean(&mut bag, &plan, 1, &mut Journal::new("t")).unwrap();
        assert_eq!(names(&bag), before);
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let temp = tempdir().unwrap();
        let plan = AlgorithmPlan::resolve(&["sha256", "sha512"], &["sha512", "md5"]).unwrap();
        let mut bag = superset_bag(temp.path(), &plan);

        clean(&mut bag, &plan, 1, &mut Journal::new("t")).unwrap();
        let first = names(&bag);
        clean(&mut bag, &plan, 1, &mut Journal::new("t")).unwrap();
        assert_eq!(names(&bag), first);
    }

    #[test]
    fn test_missing_cleanup_target_is_consistency_error() {
        let temp = tempdir().unwrap();
        let plan = AlgorithmPlan::resolve(&["sha256"], &["md5"]).unwrap();
        let mut bag = superset_bag(temp.path(), &plan);
        fs::remove_file(bag.root().join("manifest-md5.txt")).unwrap();

        let err = clean(&mut bag, &plan, 1, &mut Journal::new("t")).unwrap_err();
        assert!(matches!(err, BuildError::Consistency(_)));
    }
}
