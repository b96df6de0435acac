// src/less/mod.rs

//! A Less to CSS compiler.
//!
//! ```no_run
//! use std::path::Path;
//! use stylewatch::fs::RealFileSystem;
//! use stylewatch::less::{compile_file, Options};
//!
//! let options = Options::default().include_path("nouveau/css");
//! let output = compile_file(&RealFileSystem, Path::new("nouveau/css/main.less"), &options)?;
//! println!("{}", output.css);
//! # Ok::<(), stylewatch::less::LessError>(())
//! ```

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::fs::FileSystem;

pub mod ast;
pub mod color;
pub mod css;
pub mod error;
pub mod eval;
pub mod functions;
pub mod import;
pub mod parser;
pub mod printer;
pub mod selector;
pub mod value;

pub use error::{LessError, LessErrorKind, Span};

/// Compiler options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub include_paths: Vec<PathBuf>,
    /// Parser optimisation level (0..=2). Accepted for compatibility; it has
    /// no effect on the produced CSS.
    pub optimization: u8,
}

impl Options {
    #[must_use]
    pub fn include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    #[must_use]
    pub fn include_paths<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.include_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn optimization(mut self, level: u8) -> Self {
        self.optimization = level;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub css: String,
    /// Every file pulled in through `@import`.
    pub imports: Vec<PathBuf>,
}

/// Compile the Less file at `path`.
pub fn compile_file(fs: &dyn FileSystem, path: &Path, options: &Options) -> Result<Output, LessError> {
    let source = fs.read_to_string(path).map_err(|e| {
        LessError::new(
            LessErrorKind::Import,
            format!("could not read file: {e}"),
            path,
            Span::default(),
        )
    })?;
    compile_str(fs, &source, path, options)
}

/// Compile `source` as if it were the contents of `path`; imports resolve
/// relative to `path`.
pub fn compile_str(
    fs: &dyn FileSystem,
    source: &str,
    path: &Path,
    options: &Options,
) -> Result<Output, LessError> {
    let nodes = parser::parse(source, path)?;
    let mut importer = import::Importer::new(fs, &options.include_paths);
    let nodes = importer.resolve(nodes, path)?;
    let entries = eval::evaluate(&nodes, path)?;
    let css = printer::print(&entries);
    let imports = importer.into_imported();
    trace!(file = %path.display(), imports = imports.len(), bytes = css.len(), "compiled less");
    Ok(Output { css, imports })
}
