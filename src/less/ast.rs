// src/less/ast.rs

//! Syntax tree produced by [`super::parser`].
//!
//! Values, selectors and at-rule preludes are kept as raw text; they are
//! evaluated lazily by [`super::eval`] because their meaning depends on the
//! variable scope they are used in.

use std::path::PathBuf;

use super::error::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `/* ... */` comment, including the delimiters.
    Comment(String),
    /// `@name: value;`
    Variable {
        name: String,
        value: String,
        span: Span,
    },
    /// `property: value;`
    Declaration {
        name: String,
        value: String,
        important: bool,
        span: Span,
    },
    Ruleset(Ruleset),
    MixinCall(MixinCall),
    Import(Import),
    AtRule(AtRule),
    /// Contents of a resolved Less `@import`, spliced into the importing
    /// scope.
    Imported {
        file: PathBuf,
        reference: bool,
        nodes: Vec<Node>,
    },
    /// An `@import` kept as a plain CSS import statement.
    CssImport { text: String },
    /// Raw text of an `(inline)` import.
    InlineCss(String),
}

/// A selector block, possibly a mixin definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    /// Selector list split on top-level commas, raw (may contain `@{}`).
    pub selectors: Vec<String>,
    /// `Some` for parametric mixin definitions such as `.m(@a; @b: 2)`.
    pub params: Option<Vec<MixinParam>>,
    /// Raw guard condition following `when`.
    pub guard: Option<String>,
    pub body: Vec<Node>,
    pub span: Span,
}

impl Ruleset {
    /// Parametric definitions are never emitted as CSS.
    pub fn is_parametric(&self) -> bool {
        self.params.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MixinParam {
    /// `@name` or `@name: default`.
    Variable {
        name: String,
        default: Option<String>,
    },
    /// `...` or `@rest...`.
    Rest { name: Option<String> },
    /// A literal value the argument has to equal, e.g. `dark`.
    Pattern(String),
}

/// `.mixin(args) !important;`
#[derive(Debug, Clone, PartialEq)]
pub struct MixinCall {
    /// Selector path, e.g. `["#ns", ".m"]`.
    pub path: Vec<String>,
    pub args: Vec<MixinArg>,
    pub important: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixinArg {
    pub name: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportOptions {
    pub reference: bool,
    pub inline: bool,
    pub less: bool,
    pub css: bool,
    pub optional: bool,
    pub multiple: bool,
}

/// `@import (options) "path" media;` before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub options: ImportOptions,
    /// The unquoted target, e.g. `mixins` or `http://x/a.css`.
    pub target: String,
    /// The raw target as written, e.g. `url("a.css")`.
    pub raw_target: String,
    pub media: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// Name without the `@`, e.g. `media`.
    pub name: String,
    pub prelude: String,
    pub body: Option<Vec<Node>>,
    pub span: Span,
}

impl AtRule {
    /// Conditional group rules bubble up through enclosing selectors.
    pub fn bubbles(&self) -> bool {
        matches!(
            self.name.as_str(),
            "media" | "supports" | "document" | "-moz-document" | "container" | "layer"
        ) && self.body.is_some()
    }
}
