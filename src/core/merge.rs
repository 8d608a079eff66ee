/*!
 * Metadata directory merge
 */

use std::path::Path;

use bagsmith_core_manifest::{Bag, ChecksumAlgorithm};

use super::fs_ops::{self, MoveMethod};
use super::journal::Journal;
use crate::error::{BuildError, Result};

/// Reserved directory name for merged metadata, outside the payload
pub const META_DIR: &str = "meta";

const ORIGIN: &str = "merging";

/// Move `metadata_dir` into the bag as `meta/` and rewrite every tag-manifest
///
/// The move is not atomic. If tag-manifest regeneration fails afterwards the
/// metadata stays inside the bag.
pub fn merge_metadata(
    bag: &mut Bag,
    metadata_dir: &Path,
    workers: usize,
    journal: &mut Journal,
) -> Result<()> {
    if !metadata_dir.is_dir() {
        return Err(BuildError::configuration(format!(
            "Metadata directory {} does not exist",
            metadata_dir.display()
        )));
    }
    fs_ops::ensure_regular_tree(metadata_dir, "Metadata directory")?;
    let destination = bag.root().join(META_DIR);
    if destination.exists() {
        return Err(BuildError::configuration(format!(
            "Bag already contains '{}'",
            META_DIR
        )));
    }

    let method = fs_ops::move_dir(metadata_dir, &destination)?;
    bag.mark_tag_manifests_stale();
    journal.info(
        ORIGIN,
        format!(
            "{} moved to {} ({})",
            metadata_dir.display(),
            destination.display(),
            match method {
                MoveMethod::Renamed => "renamed",
                MoveMethod::Copied => "copied across filesystems",
            }
        ),
    );

    let algorithms: Vec<ChecksumAlgorithm> = bag.tag_algorithms()?.into_iter().collect();
    bag.regenerate_tag_manifests(&algorithms, workers)?;
    journal.info(
        ORIGIN,
        format!("regenerated {} tag-manifest(s)", algorithms.len()),
    );
    Ok(())
}
