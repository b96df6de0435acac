// src/watch/path_utils.rs

//! Path helpers shared by the watcher and source expansion.

use std::path::Path;

use crate::fs::normalize;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - A root of `.` (or empty) means paths are already project-relative.
/// - Otherwise we try a direct `strip_prefix(root)` on the normalized paths.
/// - If that fails (symlinks, `/private/var` on macOS) we canonicalize both
///   paths and try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let root = normalize(root);
    let path = normalize(path);

    if root == Path::new(".") && path.is_relative() {
        return Some(to_slash(&path));
    }

    if let Ok(rel) = path.strip_prefix(&root) {
        return Some(to_slash(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
