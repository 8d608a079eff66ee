/*!
 * Final self-validation of a finished bag
 */

use bagsmith_core_manifest::{validate, Bag, Verdict};

use super::journal::Journal;
use crate::error::{BuildError, Result};

const ORIGIN: &str = "validating";

/// Validate the bag and turn an invalid verdict into a build error
///
/// Every violation and structural problem is written to the journal.
pub fn validate_bag(bag: &Bag, workers: usize, journal: &mut Journal) -> Result<Verdict> {
    let verdict = validate(bag, workers)?;

    if verdict.valid {
        journal.info(ORIGIN, format!("{} is valid", bag.root().display()));
        return Ok(verdict);
    }

    for problem in &verdict.problems {
        journal.error(ORIGIN, problem.as_str());
    }
    for violation in &verdict.violations {
        journal.error(ORIGIN, violation.to_string());
    }
    Err(BuildError::ValidationFailure(verdict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagsmith_core_audit::{Level, Outcome};
    use bagsmith_core_manifest::{ChecksumAlgorithm, CreateOptions};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_valid_and_invalid_bags() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("in");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"a").unwrap();
        let bag = Bag::create(
            &source,
            &temp.path().join("bag"),
            &[ChecksumAlgorithm::Sha256],
            &CreateOptions::default(),
        )
        .unwrap();

        let mut journal = Journal::new("t");
        assert!(validate_bag(&bag, 1, &mut journal).unwrap().valid);

        fs::write(bag.root().join("data/a.txt"), b"b").unwrap();
        let err = validate_bag(&bag, 1, &mut journal).unwrap_err();
        match err {
            BuildError::ValidationFailure(verdict) => {
                assert!(!verdict.valid);
                assert_eq!(verdict.violations[0].path, "data/a.txt");
            }
            other => panic!("unexpected error: {}", other),
        }

        let report = journal.finalize(Outcome::Failed);
        assert_eq!(report.by_level(Level::Error).count(), 1);
    }
}
