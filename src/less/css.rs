// src/less/css.rs

//! Flat output tree produced by the evaluator and consumed by the printer.

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    /// Fully evaluated value, including a trailing ` !important`.
    pub value: String,
}

/// An enclosing conditional group rule, e.g. `@media screen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapper {
    pub name: String,
    pub prelude: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    Rule {
        selectors: Vec<String>,
        declarations: Vec<Declaration>,
    },
    AtRule {
        name: String,
        prelude: String,
        declarations: Vec<Declaration>,
        children: Vec<Entry>,
        has_body: bool,
    },
    Comment(String),
    /// A CSS `@import` statement, hoisted to the top of the output.
    Import(String),
    Raw(String),
}

/// A node together with the group rules it bubbled out of.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub wrappers: Vec<Wrapper>,
    pub node: CssNode,
}

impl Entry {
    pub fn new(wrappers: Vec<Wrapper>, node: CssNode) -> Self {
        Self { wrappers, node }
    }
}
