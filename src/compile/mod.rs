// src/compile/mod.rs

//! The compile procedure behind every `less:<target>` task.
//!
//! A [`CompileJob`] is built once from configuration and executed on every
//! trigger: expand sources, compile each with the Less compiler, join,
//! minify, then replace the destination atomically.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::fs::{FileSystem, normalize};
use crate::less::{self, LessError};

pub mod minify;
pub mod sources;

pub use minify::{CleanCssOptions, SpecialComments};
pub use sources::expand_sources;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("source not found: no file matches '{pattern}'")]
    SourceNotFound { pattern: String },

    #[error("invalid source pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Syntax(#[from] LessError),

    #[error("minifying {} failed: {message}", .path.display())]
    Minify { path: PathBuf, message: String },

    #[error("writing {} failed", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("reading {} failed", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Immutable description of one compile target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    /// Target name, e.g. `dist` for `less:dist`.
    pub target: String,
    /// Project root; every other path is relative to it.
    pub root: PathBuf,
    pub source_patterns: Vec<String>,
    pub destination: PathBuf,
    pub include_paths: Vec<PathBuf>,
    pub optimization: u8,
    pub minifier: CleanCssOptions,
}

impl CompileJob {
    pub fn new(
        target: impl Into<String>,
        source_patterns: Vec<String>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            target: target.into(),
            root: PathBuf::from("."),
            source_patterns,
            destination: destination.into(),
            include_paths: Vec::new(),
            optimization: 0,
            minifier: CleanCssOptions::disabled(),
        }
    }

    /// Destination resolved against the project root.
    pub fn destination_path(&self) -> PathBuf {
        normalize(&self.root.join(&self.destination))
    }

    /// Include paths resolved against the project root.
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        self.include_paths
            .iter()
            .map(|p| normalize(&self.root.join(p)))
            .collect()
    }
}

/// What a successful compile produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    pub destination: PathBuf,
    pub sources: Vec<PathBuf>,
    /// Every file pulled in through `@import`, across all sources.
    pub imports: Vec<PathBuf>,
    pub bytes: usize,
}

/// Run `job` once.
///
/// On any error the destination is left as it was.
pub fn compile(fs: &dyn FileSystem, job: &CompileJob) -> Result<CompileReport, CompileError> {
    let sources = expand_sources(fs, &job.root, &job.source_patterns)?;
    let include_dirs = job.include_dirs();
    let destination = job.destination_path();

    debug!(
        target = %job.target,
        sources = sources.len(),
        optimization = job.optimization,
        "compiling less target"
    );

    let options = less::Options::default()
        .include_paths(include_dirs.iter().cloned())
        .optimization(job.optimization);

    let mut parts = Vec::with_capacity(sources.len());
    let mut imports: Vec<PathBuf> = Vec::new();
    for source in &sources {
        let output = less::compile_file(fs, source, &options)?;
        for import in output.imports {
            if !imports.contains(&import) {
                imports.push(import);
            }
        }
        parts.push(output.css);
    }
    let css = parts.join("\n");

    let base_dir = sources
        .first()
        .and_then(|s| s.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| job.root.clone(), Path::to_path_buf);
    let css = minify::minify(fs, &css, &destination, &base_dir, &include_dirs, &job.minifier)?;

    fs.write(&destination, css.as_bytes())
        .map_err(|source| CompileError::WriteFailure {
            path: destination.clone(),
            source,
        })?;

    info!(
        target = %job.target,
        destination = %destination.display(),
        bytes = css.len(),
        "File {} created",
        destination.display()
    );

    Ok(CompileReport {
        destination,
        sources,
        imports,
        bytes: css.len(),
    })
}
