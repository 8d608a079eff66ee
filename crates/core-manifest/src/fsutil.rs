//! Directory-tree helpers shared by bag creation and the build pipeline

use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path};
use walkdir::WalkDir;

/// Totals for a copied tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSummary {
    /// Number of regular files
    pub files: u64,
    /// Sum of file sizes in bytes
    pub bytes: u64,
}

/// Recursively copy the contents of `src` into `dst`
///
/// `dst` is created if needed. Symbolic links are followed so the copy holds
/// their content.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<TreeSummary> {
    let mut summary = TreeSummary::default();
    fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).follow_links(true).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| Error::invalid_path(entry.path()))?;
        let dest_path = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry.file_type().is_file() {
            summary.bytes += fs::copy(entry.path(), &dest_path)?;
            summary.files += 1;
        }
    }

    Ok(summary)
}

/// Count the regular files and bytes under `dir`
pub fn summarize_tree(dir: &Path) -> Result<TreeSummary> {
    let mut summary = TreeSummary::default();
    for entry in WalkDir::new(dir).follow_links(true).min_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            summary.files += 1;
            summary.bytes += entry.metadata()?.len();
        }
    }
    Ok(summary)
}

/// List regular files below `root.join(subdir)` as bag paths relative to `root`
///
/// Result is sorted. An empty `subdir` lists the whole tree.
pub fn list_files(root: &Path, subdir: &Path) -> Result<Vec<String>> {
    let start = root.join(subdir);
    let mut files = Vec::new();

    for entry in WalkDir::new(&start).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::invalid_path(entry.path()))?;
        files.push(to_bag_path(relative)?);
    }

    files.sort();
    Ok(files)
}

/// Entries below `root` that are neither regular files nor directories
///
/// Links are not followed, so a symlink is reported itself and its target is
/// never visited. Paths are relative to `root`, sorted.
pub fn irregular_entries(root: &Path) -> Result<Vec<String>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_file() || file_type.is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::invalid_path(entry.path()))?;
        found.push(to_bag_path(relative)?);
    }
    found.sort();
    Ok(found)
}

/// Render a relative filesystem path with `/` separators
pub fn to_bag_path(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| Error::invalid_path(relative))?;
                parts.push(part);
            }
            _ => return Err(Error::invalid_path(relative)),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        fs::write(root.join("nested/b.txt"), b"bravo!").unwrap();
        fs::write(root.join("nested/deeper/c.bin"), [0u8; 10]).unwrap();
    }

    #[test]
    fn test_copy_tree_preserves_layout() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        sample_tree(&src);

        let summary = copy_tree(&src, &dst).unwrap();

        assert_eq!(summary, TreeSummary { files: 3, bytes: 21 });
        assert_eq!(fs::read(dst.join("nested/b.txt")).unwrap(), b"bravo!");
        assert!(src.join("a.txt").exists(), "source must stay intact");
    }

    #[test]
    fn test_list_files_relative_and_sorted() {
        let temp = tempdir().unwrap();
        sample_tree(&temp.path().join("data"));
        fs::write(temp.path().join("bagit.txt"), b"x").unwrap();

        let payload = list_files(temp.path(), Path::new("data")).unwrap();
        assert_eq!(
            payload,
            vec!["data/a.txt", "data/nested/b.txt", "data/nested/deeper/c.bin"]
        );

        let all = list_files(temp.path(), Path::new("")).unwrap();
        assert_eq!(all.first().map(String::as_str), Some("bagit.txt"));
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_summarize_tree() {
        let temp = tempdir().unwrap();
        sample_tree(temp.path());
        assert_eq!(
            summarize_tree(temp.path()).unwrap(),
            TreeSummary { files: 3, bytes: 21 }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_irregular_entries_reports_symlinks() {
        let temp = tempdir().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir_all(outside.join("inner")).unwrap();
        fs::write(outside.join("inner/x.txt"), b"x").unwrap();

        let root = temp.path().join("tree");
        sample_tree(&root);
        std::os::unix::fs::symlink(outside.join("inner"), root.join("linked-dir")).unwrap();
        std::os::unix::fs::symlink(root.join("a.txt"), root.join("nested/linked.txt")).unwrap();

        assert_eq!(
            irregular_entries(&root).unwrap(),
            vec!["linked-dir", "nested/linked.txt"]
        );
        assert!(irregular_entries(&outside).unwrap().is_empty());
    }

    #[test]
    fn test_to_bag_path_rejects_parent_components() {
        assert_eq!(to_bag_path(Path::new("data/x/y.txt")).unwrap(), "data/x/y.txt");
        assert!(to_bag_path(Path::new("../escape.txt")).is_err());
    }
}
