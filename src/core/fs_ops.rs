/*!
 * Filesystem operations used between pipeline stages
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bagsmith_core_manifest::fsutil::{copy_tree, irregular_entries, summarize_tree};
use tracing::debug;
use uuid::Uuid;

use crate::error::{BuildError, Result};

/// How a directory reached its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMethod {
    /// Single `rename` on the same filesystem
    Renamed,
    /// Copied to a staging directory, verified, committed, source removed
    Copied,
}

/// Move `src` to `dst`, which must not exist
///
/// Falls back to [`copy_then_commit`] when `rename` fails because the two
/// paths are on different filesystems. Any other rename failure is returned.
pub fn move_dir(src: &Path, dst: &Path) -> Result<MoveMethod> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(MoveMethod::Renamed),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(
                "rename {} -> {} crosses filesystems, copying instead",
                src.display(),
                dst.display()
            );
            copy_then_commit(src, dst)?;
            Ok(MoveMethod::Copied)
        }
        Err(e) => Err(BuildError::packaging(format!(
            "Cannot move {} to {}: {}",
            src.display(),
            dst.display(),
            e
        ))),
    }
}

/// Copy `src` into a staging sibling of `dst`, verify, commit, remove `src`
///
/// The staging directory is removed again if the copy fails or comes out
/// incomplete. Not atomic: if removing `src` fails after the commit, both
/// copies remain.
pub fn copy_then_commit(src: &Path, dst: &Path) -> Result<()> {
    let staging = staging_path(dst)?;
    if let Err(e) = stage_copy(src, &staging) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    fs::rename(&staging, dst)?;
    fs::remove_dir_all(src)?;
    Ok(())
}

fn stage_copy(src: &Path, staging: &Path) -> Result<()> {
    let copied = copy_tree(src, staging)?;
    let expected = summarize_tree(src)?;
    if copied != expected {
        return Err(BuildError::packaging(format!(
            "Copy of {} is incomplete: {} files / {} bytes expected, {} files / {} bytes copied",
            src.display(),
            expected.files,
            expected.bytes,
            copied.files,
            copied.bytes
        )));
    }
    Ok(())
}

/// Fresh `.staging-<uuid>` path next to `path`
pub fn staging_path(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().ok_or_else(|| {
        BuildError::packaging(format!("{} has no parent directory", path.display()))
    })?;
    Ok(parent.join(format!(".staging-{}", Uuid::new_v4().simple())))
}

/// Replace the directory `dst` with `src`, which must be a sibling
///
/// `dst` is removed before the rename, so a failing rename leaves only `src`.
pub fn replace_dir(src: &Path, dst: &Path) -> Result<()> {
    clear_dir(dst)?;
    fs::rename(src, dst).map_err(|e| {
        BuildError::packaging(format!(
            "Cannot move {} into place at {}: {}",
            src.display(),
            dst.display(),
            e
        ))
    })
}

/// Reject a directory that is a symlink or contains any non-regular entry
pub fn ensure_regular_tree(dir: &Path, role: &str) -> Result<()> {
    let is_link = fs::symlink_metadata(dir)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if is_link {
        return Err(BuildError::configuration(format!(
            "{} {} is a symbolic link",
            role,
            dir.display()
        )));
    }

    let irregular = irregular_entries(dir)?;
    if !irregular.is_empty() {
        return Err(BuildError::configuration(format!(
            "{} {} contains symbolic links or special files: {}",
            role,
            dir.display(),
            irregular.join(", ")
        )));
    }
    Ok(())
}

/// Remove a directory tree if it exists
pub fn clear_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Absolute, symlink-resolved form of a path
///
/// For paths that do not exist yet, the deepest existing ancestor is
/// resolved and the remaining components are appended.
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return rest.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

/// Whether `inner` equals `outer` or lies below it
pub fn is_within(inner: &Path, outer: &Path) -> bool {
    resolve_path(inner).starts_with(resolve_path(outer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_move_dir_renames() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("meta-in");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("sub/mets.xml"), b"<mets/>").unwrap();
        let dst = temp.path().join("bag/meta");
        fs::create_dir_all(temp.path().join("bag")).unwrap();

        assert_eq!(move_dir(&src, &dst).unwrap(), MoveMethod::Renamed);
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("sub/mets.xml")).unwrap(), b"<mets/>");
    }

    #[test]
    fn test_move_missing_source_fails() {
        let temp = tempdir().unwrap();
        let err = move_dir(&temp.path().join("absent"), &temp.path().join("dst")).unwrap_err();
        assert!(matches!(err, BuildError::Packaging(_)));
    }

    #[test]
    fn test_copy_then_commit_moves_tree() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("meta-in");
        fs::create_dir_all(src.join("premis")).unwrap();
        fs::write(src.join("mets.xml"), b"<mets/>").unwrap();
        fs::write(src.join("premis/events.xml"), b"<premis/>").unwrap();
        let bag = temp.path().join("bag");
        fs::create_dir_all(&bag).unwrap();

        copy_then_commit(&src, &bag.join("meta")).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(bag.join("meta/premis/events.xml")).unwrap(), b"<premis/>");
        let leftovers: Vec<_> = fs::read_dir(&bag).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "only meta/ remains in the bag root");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_copy_removes_staging() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("meta-in");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("mets.xml"), b"<mets/>").unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), src.join("dangling")).unwrap();
        let bag = temp.path().join("bag");
        fs::create_dir_all(&bag).unwrap();

        assert!(copy_then_commit(&src, &bag.join("meta")).is_err());

        assert!(src.join("mets.xml").exists(), "source is kept on failure");
        assert_eq!(fs::read_dir(&bag).unwrap().count(), 0);
    }

    #[test]
    fn test_replace_dir_swaps_sibling() {
        let temp = tempdir().unwrap();
        let old = temp.path().join("package");
        fs::create_dir_all(old.join("data")).unwrap();
        fs::write(old.join("data/a.txt"), b"old").unwrap();
        let new = staging_path(&old).unwrap();
        fs::create_dir_all(&new).unwrap();
        fs::write(new.join("bagit.txt"), b"new").unwrap();

        replace_dir(&new, &old).unwrap();

        assert!(!new.exists());
        assert!(old.join("bagit.txt").is_file());
        assert!(!old.join("data").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_regular_tree_rejects_links() {
        let temp = tempdir().unwrap();
        let real = temp.path().join("real-meta");
        fs::create_dir_all(&real).unwrap();
        fs::write(real.join("mets.xml"), b"<mets/>").unwrap();
        ensure_regular_tree(&real, "Metadata directory").unwrap();

        let linked = temp.path().join("linked-meta");
        std::os::unix::fs::symlink(&real, &linked).unwrap();
        let err = ensure_regular_tree(&linked, "Metadata directory").unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));

        std::os::unix::fs::symlink(real.join("mets.xml"), real.join("premis.xml")).unwrap();
        let err = ensure_regular_tree(&real, "Metadata directory").unwrap_err();
        assert!(err.to_string().contains("premis.xml"));
    }

    #[test]
    fn test_clear_dir_is_idempotent() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("target");
        fs::create_dir_all(dir.join("data")).unwrap();
        clear_dir(&dir).unwrap();
        assert!(!dir.exists());
        clear_dir(&dir).unwrap();
    }

    #[test]
    fn test_is_within() {
        let temp = tempdir().unwrap();
        let outer = temp.path().join("outer");
        fs::create_dir_all(outer.join("inner")).unwrap();

        assert!(is_within(&outer.join("inner"), &outer));
        assert!(is_within(&outer, &outer));
        assert!(is_within(&outer.join("not-yet-created"), &outer));
        assert!(!is_within(&outer, &outer.join("inner")));
        assert!(!is_within(&temp.path().join("outer2"), &outer));
    }
}
