/*!
 * Algorithm-set reconciliation
 *
 * The packaging primitive writes payload manifests and tag-manifests for one
 * shared set of algorithms. A build that wants different sets per role first
 * creates the bag for the union of both, then removes what each role does
 * not need. This module computes that union and the role split. It does no
 * I/O.
 */

use std::collections::BTreeSet;
use std::str::FromStr;

use bagsmith_core_manifest::ChecksumAlgorithm;

use crate::error::{BuildError, Result};

/// Which algorithms go where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmPlan {
    /// Payload ∪ tag; what the bag is created with
    pub superset: BTreeSet<ChecksumAlgorithm>,
    /// Payload-manifest only; their tag-manifests are removed
    pub payload_only: BTreeSet<ChecksumAlgorithm>,
    /// Tag-manifest only; their payload manifests are removed
    pub tag_only: BTreeSet<ChecksumAlgorithm>,
    /// Kept in both roles
    pub shared: BTreeSet<ChecksumAlgorithm>,
}

impl AlgorithmPlan {
    /// Build a plan from the identifiers of both roles
    ///
    /// Identifiers are matched case-insensitively. Either set being empty, or
    /// any identifier outside the supported enumeration, is a configuration
    /// error.
    pub fn resolve<P, T>(payload: &[P], tag: &[T]) -> Result<Self>
    where
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let payload = parse_set("payload manifest", payload)?;
        let tag = parse_set("tag-manifest", tag)?;

        Ok(Self {
            superset: payload.union(&tag).copied().collect(),
            payload_only: payload.difference(&tag).copied().collect(),
            tag_only: tag.difference(&payload).copied().collect(),
            shared: payload.intersection(&tag).copied().collect(),
        })
    }

    /// Algorithms whose payload manifests survive
    pub fn payload_algorithms(&self) -> BTreeSet<ChecksumAlgorithm> {
        self.payload_only.union(&self.shared).copied().collect()
    }

    /// Algorithms whose tag-manifests survive
    pub fn tag_algorithms(&self) -> BTreeSet<ChecksumAlgorithm> {
        self.tag_only.union(&self.shared).copied().collect()
    }

    /// Whether the roles differ, so the cleaner has something to remove
    pub fn needs_cleanup(&self) -> bool {
        !self.payload_only.is_empty() || !self.tag_only.is_empty()
    }

    pub fn superset_list(&self) -> Vec<ChecksumAlgorithm> {
        self.superset.iter().copied().collect()
    }

    pub fn tag_list(&self) -> Vec<ChecksumAlgorithm> {
        self.tag_algorithms().into_iter().collect()
    }
}

fn parse_set<S: AsRef<str>>(role: &str, names: &[S]) -> Result<BTreeSet<ChecksumAlgorithm>> {
    if names.is_empty() {
        return Err(BuildError::configuration(format!(
            "At least one {} algorithm is required",
            role
        )));
    }

    let mut unsupported = Vec::new();
    let mut set = BTreeSet::new();
    for name in names {
        match ChecksumAlgorithm::from_str(name.as_ref()) {
            Ok(alg) => {
                set.insert(alg);
            }
            Err(_) => unsupported.push(name.as_ref().to_string()),
        }
    }

    if !unsupported.is_empty() {
        let supported: Vec<&str> = ChecksumAlgorithm::ALL.iter().map(|a| a.as_str()).collect();
        return Err(BuildError::configuration(format!(
            "Unsupported {} algorithm(s): {} (supported: {})",
            role,
            unsupported.join(", "),
            supported.join(", ")
        )));
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ChecksumAlgorithm::*;

    fn set(algs: &[ChecksumAlgorithm]) -> BTreeSet<ChecksumAlgorithm> {
        algs.iter().copied().collect()
    }

    #[test]
    fn test_disjoint_sets() {
        let plan = AlgorithmPlan::resolve(&["sha256"], &["md5"]).unwrap();
        assert_eq!(plan.superset, set(&[Md5, Sha256]));
        assert_eq!(plan.payload_only, set(&[Sha256]));
        assert_eq!(plan.tag_only, set(&[Md5]));
        assert!(plan.shared.is_empty());
        assert!(plan.needs_cleanup());
    }

    #[test]
    fn test_equal_sets_need_no_cleanup() {
        let plan = AlgorithmPlan::resolve(&["sha256", "SHA512"], &["sha512", "sha256"]).unwrap();
        assert!(!plan.needs_cleanup());
        assert_eq!(plan.shared, plan.superset);
    }

    #[test]
    fn test_partition_invariants() {
        let plan = AlgorithmPlan::resolve(&["md5", "sha1", "sha256"], &["sha256", "sha512"]).unwrap();
        assert!(plan.payload_only.is_disjoint(&plan.tag_only));

        let mut all = plan.payload_only.clone();
        all.extend(&plan.tag_only);
        all.extend(&plan.shared);
        assert_eq!(all, plan.superset);

        assert_eq!(plan.payload_algorithms(), set(&[Md5, Sha1, Sha256]));
        assert_eq!(plan.tag_algorithms(), set(&[Sha256, Sha512]));
    }

    #[test]
    fn test_duplicates_collapse() {
        let plan = AlgorithmPlan::resolve(&["sha256", "sha256"], &["sha256"]).unwrap();
        assert_eq!(plan.superset.len(), 1);
    }

    #[test]
    fn test_empty_set_is_configuration_error() {
        let empty: [&str; 0] = [];
        let err = AlgorithmPlan::resolve(&empty, &["md5"]).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
        let err = AlgorithmPlan::resolve(&["md5"], &empty).unwrap_err();
        assert!(err.to_string().contains("tag-manifest"));
    }

    #[test]
    fn test_unsupported_identifier_is_configuration_error() {
        let err = AlgorithmPlan::resolve(&["sha256", "crc32"], &["md5"]).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
        assert!(err.to_string().contains("crc32"));
    }
}
