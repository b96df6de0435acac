// src/less/import.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ast::{AtRule, Import, Node};
use super::error::{LessError, LessErrorKind};
use super::parser;
use crate::fs::{normalize, FileSystem};

/// Resolves `@import` statements by splicing the imported files' syntax
/// trees into the importing tree.
pub struct Importer<'f> {
    fs: &'f dyn FileSystem,
    include_paths: &'f [PathBuf],
    seen: HashSet<PathBuf>,
    stack: Vec<PathBuf>,
    imported: Vec<PathBuf>,
}

impl<'f> Importer<'f> {
    pub fn new(fs: &'f dyn FileSystem, include_paths: &'f [PathBuf]) -> Self {
        Self {
            fs,
            include_paths,
            seen: HashSet::new(),
            stack: Vec::new(),
            imported: Vec::new(),
        }
    }

    /// Files pulled in through `@import`, in first-seen order.
    pub fn into_imported(self) -> Vec<PathBuf> {
        self.imported
    }

    pub fn resolve(&mut self, nodes: Vec<Node>, file: &Path) -> Result<Vec<Node>, LessError> {
        let root = normalize(file);
        self.seen.insert(root.clone());
        self.stack.push(root);
        let result = self.resolve_nodes(nodes, file);
        self.stack.pop();
        result
    }

    fn resolve_nodes(&mut self, nodes: Vec<Node>, file: &Path) -> Result<Vec<Node>, LessError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Import(import) => {
                    if let Some(resolved) = self.resolve_import(import, file)? {
                        out.push(resolved);
                    }
                }
                Node::Ruleset(mut rs) => {
                    rs.body = self.resolve_nodes(rs.body, file)?;
                    out.push(Node::Ruleset(rs));
                }
                Node::AtRule(mut at) => {
                    if let Some(body) = at.body.take() {
                        at.body = Some(self.resolve_nodes(body, file)?);
                    }
                    out.push(Node::AtRule(at));
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn resolve_import(&mut self, import: Import, file: &Path) -> Result<Option<Node>, LessError> {
        let options = import.options;
        let target = import.target.as_str();
        let remote = target.starts_with("http://")
            || target.starts_with("https://")
            || target.starts_with("//");
        let extension = Path::new(target)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        let is_css = extension.as_deref() == Some("css");

        if options.css || remote || (is_css && !options.less && !options.inline) {
            let mut text = format!("@import {}", import.raw_target);
            if !import.media.is_empty() {
                text.push(' ');
                text.push_str(&import.media);
            }
            text.push(';');
            return Ok(Some(Node::CssImport { text }));
        }

        let wanted = if extension.is_none() {
            format!("{target}.less")
        } else {
            target.to_string()
        };

        let candidates = self.candidates(&wanted, file);
        let Some(path) = candidates.iter().find(|p| self.fs.is_file(p)).cloned() else {
            if options.optional {
                debug!(import = %target, from = %file.display(), "optional import not found");
                return Ok(None);
            }
            let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            return Err(LessError::new(
                LessErrorKind::Import,
                format!("'{target}' wasn't found. Tried - {}", tried.join(", ")),
                file,
                import.span,
            ));
        };

        if self.stack.contains(&path) && options.multiple {
            return Err(LessError::new(
                LessErrorKind::Recursion,
                format!("'{target}' imports itself"),
                file,
                import.span,
            ));
        }
        if !options.multiple && self.seen.contains(&path) {
            debug!(import = %path.display(), "already imported, skipping");
            return Ok(None);
        }
        self.seen.insert(path.clone());
        if !self.imported.contains(&path) {
            self.imported.push(path.clone());
        }

        let source = self.fs.read_to_string(&path).map_err(|e| {
            LessError::new(
                LessErrorKind::Import,
                format!("could not read '{}': {e}", path.display()),
                file,
                import.span,
            )
        })?;

        if options.inline {
            return Ok(Some(Node::InlineCss(source)));
        }

        let nodes = parser::parse(&source, &path)?;
        self.stack.push(path.clone());
        let nodes = self.resolve_nodes(nodes, &path);
        self.stack.pop();
        let mut nodes = nodes?;

        if !import.media.is_empty() {
            nodes = vec![Node::AtRule(AtRule {
                name: "media".to_string(),
                prelude: import.media.clone(),
                body: Some(nodes),
                span: import.span,
            })];
        }

        Ok(Some(Node::Imported {
            file: path,
            reference: options.reference,
            nodes,
        }))
    }

    /// Directory of the importing file first, then each include path.
    fn candidates(&self, wanted: &str, file: &Path) -> Vec<PathBuf> {
        let base = file.parent().unwrap_or_else(|| Path::new("."));
        let mut out = vec![normalize(&base.join(wanted))];
        for dir in self.include_paths {
            let candidate = normalize(&dir.join(wanted));
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }
}
