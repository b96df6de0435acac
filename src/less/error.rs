// src/less/error.rs

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Category of a compiler error, named the way Less reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessErrorKind {
    /// Malformed source text.
    Parse,
    /// Reference to an undefined variable or mixin.
    Name,
    /// An `@import` that could not be resolved or read.
    Import,
    /// Wrong number or kind of arguments to a function or mixin.
    Argument,
    /// Self-referencing variable or runaway mixin recursion.
    Recursion,
    /// Arithmetic on incompatible values.
    Operation,
}

impl fmt::Display for LessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LessErrorKind::Parse => "ParseError",
            LessErrorKind::Name => "NameError",
            LessErrorKind::Import => "FileError",
            LessErrorKind::Argument => "ArgumentError",
            LessErrorKind::Recursion => "RecursionError",
            LessErrorKind::Operation => "OperationError",
        };
        f.write_str(name)
    }
}

/// Line/column position inside a source file (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// An error reported by the Less compiler, with its source location.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message} in {}:{}:{}", .file.display(), .span.line, .span.column)]
pub struct LessError {
    pub kind: LessErrorKind,
    pub message: String,
    pub file: PathBuf,
    pub span: Span,
}

impl LessError {
    pub fn new(
        kind: LessErrorKind,
        message: impl Into<String>,
        file: impl Into<PathBuf>,
        span: Span,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            file: file.into(),
            span,
        }
    }
}

/// Location-free error produced while evaluating a value expression.
///
/// The evaluator attaches file and span before surfacing it as a
/// [`LessError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    pub kind: LessErrorKind,
    pub message: String,
}

impl ValueError {
    pub fn new(kind: LessErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn at(self, file: impl Into<PathBuf>, span: Span) -> LessError {
        LessError::new(self.kind, self.message, file, span)
    }
}
