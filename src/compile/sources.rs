// src/compile/sources.rs

//! Expansion of a target's source patterns into concrete files.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::trace;

use super::CompileError;
use crate::fs::{FileSystem, normalize};
use crate::watch::path_utils::relative_str;

/// True if `pattern` contains glob syntax.
///
/// `*` never crosses a `/`; use `**` for recursive matches.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Expand `patterns` (relative to `root`) into an ordered, de-duplicated
/// list of files.
///
/// - A literal path must name an existing file.
/// - A glob must match at least one file; its matches are sorted.
/// - A pattern starting with `!` removes earlier matches.
pub fn expand_sources(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[String],
) -> Result<Vec<PathBuf>, CompileError> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            let matcher = compile_glob(negated)?;
            files.retain(|f| {
                relative_str(root, f).is_none_or(|rel| !matcher.is_match(rel.as_str()))
            });
            continue;
        }

        let matched = if is_glob(pattern) {
            glob_files(fs, root, pattern)?
        } else {
            let path = normalize(&root.join(pattern));
            if fs.is_file(&path) { vec![path] } else { Vec::new() }
        };

        if matched.is_empty() {
            return Err(CompileError::SourceNotFound {
                pattern: pattern.clone(),
            });
        }
        trace!(pattern = %pattern, matched = matched.len(), "expanded source pattern");

        for path in matched {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher, CompileError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| CompileError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Walk from the pattern's literal directory prefix and collect matches.
fn glob_files(fs: &dyn FileSystem, root: &Path, pattern: &str) -> Result<Vec<PathBuf>, CompileError> {
    let matcher = compile_glob(pattern)?;
    let start = normalize(&root.join(literal_prefix(pattern)));
    if !fs.is_dir(&start) {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![start];
    while let Some(dir) = stack.pop() {
        let entries = fs.read_dir(&dir).map_err(|source| CompileError::Io {
            path: dir.clone(),
            source,
        })?;
        for path in entries {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Some(rel) = relative_str(root, &path) {
                    if matcher.is_match(rel.as_str()) {
                        files.push(normalize(&path));
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Leading path components that contain no glob syntax.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut parts = pattern.split('/').peekable();
    while let Some(part) = parts.next() {
        // The last component is a file name even when it is literal.
        if is_glob(part) || parts.peek().is_none() {
            break;
        }
        prefix.push(part);
    }
    prefix
}
