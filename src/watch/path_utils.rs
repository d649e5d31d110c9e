// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

use crate::types::RelativePath;

/// Convert a path into a [`RelativePath`] under `root`.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again. A deleted file cannot be
///   canonicalized, so in that case only its parent is.
///
/// Returns `None` if the path cannot be related to `root`, or if it is the
/// root itself.
pub fn relative_path(root: &Path, path: &Path) -> Option<RelativePath> {
    if let Ok(rel) = path.strip_prefix(root) {
        return non_empty(rel);
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .and_then(non_empty)
}

fn non_empty(rel: &Path) -> Option<RelativePath> {
    let rel = RelativePath::new(rel.to_string_lossy());
    if rel.is_empty() { None } else { Some(rel) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn strips_root_prefix() {
        let root = PathBuf::from("/work/project");
        let rel = relative_path(&root, &root.join("src").join("main.cpp")).unwrap();
        assert_eq!(rel.as_str(), "src/main.cpp");
    }

    #[test]
    fn root_itself_is_not_a_relative_path() {
        let root = PathBuf::from("/work/project");
        assert!(relative_path(&root, &root).is_none());
    }

    #[test]
    fn unrelated_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        assert!(relative_path(dir.path(), &other.path().join("x.cpp")).is_none());
    }
}
