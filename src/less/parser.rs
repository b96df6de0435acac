// src/less/parser.rs

//! Recursive-descent parser from Less source text to [`Node`]s.
//!
//! The parser only decides statement structure (rulesets, declarations,
//! variables, mixin calls, imports, at-rules). Expressions stay raw text.

use std::path::{Path, PathBuf};

use super::ast::{
    AtRule, Import, ImportOptions, MixinArg, MixinCall, MixinParam, Node, Ruleset,
};
use super::error::{LessError, LessErrorKind, Span};

type Result<T> = std::result::Result<T, LessError>;

/// Parse a whole stylesheet.
pub fn parse(source: &str, file: &Path) -> Result<Vec<Node>> {
    let mut parser = Parser::new(source, file);
    let nodes = parser.parse_nodes(false)?;
    Ok(nodes)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    file: PathBuf,
    line_starts: Vec<usize>,
}

impl Parser {
    fn new(source: &str, file: &Path) -> Self {
        // A leading BOM is not part of the stylesheet.
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let chars: Vec<char> = source.chars().collect();
        let mut line_starts = vec![0];
        for (i, c) in chars.iter().enumerate() {
            if *c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            chars,
            pos: 0,
            file: file.to_path_buf(),
            line_starts,
        }
    }

    fn span_at(&self, pos: usize) -> Span {
        let line = match self.line_starts.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Span {
            line: line + 1,
            column: pos - self.line_starts[line] + 1,
        }
    }

    fn error(&self, message: impl Into<String>, pos: usize) -> LessError {
        LessError::new(LessErrorKind::Parse, message, &self.file, self.span_at(pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Skip whitespace and comments; block comments are collected as nodes.
    fn skip_trivia(&mut self, nodes: &mut Vec<Node>) -> Result<()> {
        loop {
            self.skip_whitespace();
            match (self.peek(), self.peek_at(1)) {
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    let end = self.find_comment_end(start)?;
                    let text: String = self.chars[start..end].iter().collect();
                    nodes.push(Node::Comment(text));
                    self.pos = end;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Position just past the `*/` closing the comment starting at `start`.
    fn find_comment_end(&self, start: usize) -> Result<usize> {
        let mut i = start + 2;
        while i + 1 < self.chars.len() {
            if self.chars[i] == '*' && self.chars[i + 1] == '/' {
                return Ok(i + 2);
            }
            i += 1;
        }
        Err(self.error("missing closing `*/`", start))
    }

    fn parse_nodes(&mut self, in_block: bool) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            self.skip_trivia(&mut nodes)?;
            match self.peek() {
                None => {
                    if in_block {
                        return Err(self.error("missing closing `}`", self.pos));
                    }
                    break;
                }
                Some('}') => {
                    if in_block {
                        break;
                    }
                    return Err(self.error("unexpected `}`", self.pos));
                }
                Some(';') => {
                    self.pos += 1;
                }
                Some('@') if self.peek_at(1) != Some('{') => {
                    if let Some(node) = self.parse_at_statement()? {
                        nodes.push(node);
                    }
                }
                Some(_) => {
                    if let Some(node) = self.parse_statement()? {
                        nodes.push(node);
                    }
                }
            }
        }
        Ok(nodes)
    }

    /// Read raw text up to (not including) the first of `stops` found at
    /// nesting depth zero. Strings, brackets, interpolations and comments
    /// are skipped over; comments are dropped from the returned text.
    fn scan(&mut self, stops: &[char]) -> Result<(String, Option<char>)> {
        let mut out = String::new();
        let mut depth: usize = 0;

        while let Some(c) = self.peek() {
            if depth == 0 && stops.contains(&c) {
                return Ok((out, Some(c)));
            }
            match c {
                '"' | '\'' => {
                    let start = self.pos;
                    out.push(c);
                    self.pos += 1;
                    loop {
                        match self.peek() {
                            None => return Err(self.error("unterminated string", start)),
                            Some('\\') => {
                                out.push('\\');
                                self.pos += 1;
                                if let Some(next) = self.peek() {
                                    out.push(next);
                                    self.pos += 1;
                                }
                            }
                            Some(q) if q == c => {
                                out.push(q);
                                self.pos += 1;
                                break;
                            }
                            Some(other) => {
                                out.push(other);
                                self.pos += 1;
                            }
                        }
                    }
                }
                '@' if self.peek_at(1) == Some('{') => {
                    let start = self.pos;
                    while let Some(n) = self.peek() {
                        out.push(n);
                        self.pos += 1;
                        if n == '}' {
                            break;
                        }
                    }
                    if !out.ends_with('}') {
                        return Err(self.error("unterminated interpolation", start));
                    }
                }
                '/' if self.peek_at(1) == Some('*') => {
                    let end = self.find_comment_end(self.pos)?;
                    self.pos = end;
                    out.push(' ');
                }
                '/' if self.peek_at(1) == Some('/') && depth == 0 => {
                    while let Some(n) = self.peek() {
                        if n == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                '(' | '[' => {
                    depth += 1;
                    out.push(c);
                    self.pos += 1;
                }
                ')' | ']' => {
                    if depth == 0 {
                        return Err(self.error(format!("unexpected `{c}`"), self.pos));
                    }
                    depth -= 1;
                    out.push(c);
                    self.pos += 1;
                }
                '\\' => {
                    out.push(c);
                    self.pos += 1;
                    if let Some(next) = self.peek() {
                        out.push(next);
                        self.pos += 1;
                    }
                }
                _ => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }

        if depth > 0 {
            return Err(self.error("missing closing `)`", self.pos));
        }
        Ok((out, None))
    }

    fn parse_statement(&mut self) -> Result<Option<Node>> {
        let start = self.pos;
        let span = self.span_at(start);
        let (text, term) = self.scan(&['{', ';', '}'])?;

        if term == Some('{') {
            self.pos += 1;
            let body = self.parse_nodes(true)?;
            self.pos += 1; // closing brace
            let ruleset = self.build_ruleset(&text, body, span, start)?;
            return Ok(Some(Node::Ruleset(ruleset)));
        }

        if term == Some(';') {
            self.pos += 1;
        }

        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if text.starts_with('.') || text.starts_with('#') {
            let call = self.parse_mixin_call(text, span, start)?;
            return Ok(Some(Node::MixinCall(call)));
        }

        if is_extend(text) {
            return Err(self.error("extend is not supported", start));
        }

        let Some(colon) = find_top_level(text, ':') else {
            return Err(self.error(format!("unrecognised input `{text}`"), start));
        };
        let name = text[..colon].trim().to_string();
        if name.is_empty() {
            return Err(self.error("expected a property name before `:`", start));
        }
        let (value, important) = strip_important(text[colon + 1..].trim());

        Ok(Some(Node::Declaration {
            name,
            value: value.to_string(),
            important,
            span,
        }))
    }

    fn parse_at_statement(&mut self) -> Result<Option<Node>> {
        let start = self.pos;
        let span = self.span_at(start);
        self.pos += 1; // '@'

        let name_start = self.pos;
        while matches!(self.peek(), Some(c) if is_name_char(c)) {
            self.pos += 1;
        }
        let name: String = self.chars[name_start..self.pos].iter().collect();
        if name.is_empty() {
            return Err(self.error("expected a name after `@`", start));
        }

        let after_name = self.pos;
        self.skip_whitespace();
        // `@page :first` is a page selector, not a variable.
        let is_variable =
            self.peek() == Some(':') && (self.pos == after_name || name != "page");
        if is_variable {
            self.pos += 1;
            self.skip_whitespace();
            if self.peek() == Some('{') {
                return Err(self.error("detached rulesets are not supported", self.pos));
            }
            let (value, term) = self.scan(&[';', '}'])?;
            if term == Some(';') {
                self.pos += 1;
            }
            return Ok(Some(Node::Variable {
                name,
                value: value.trim().to_string(),
                span,
            }));
        }
        self.pos = after_name;

        match name.as_str() {
            "import" => self.parse_import(span, start).map(|i| Some(Node::Import(i))),
            "plugin" => Err(self.error("@plugin is not supported", start)),
            _ => {
                let (prelude, term) = self.scan(&['{', ';', '}'])?;
                let body = if term == Some('{') {
                    self.pos += 1;
                    let nodes = self.parse_nodes(true)?;
                    self.pos += 1;
                    Some(nodes)
                } else {
                    if term == Some(';') {
                        self.pos += 1;
                    }
                    None
                };
                Ok(Some(Node::AtRule(AtRule {
                    name: name.to_ascii_lowercase(),
                    prelude: collapse_whitespace(prelude.trim()),
                    body,
                    span,
                })))
            }
        }
    }

    fn parse_import(&mut self, span: Span, start: usize) -> Result<Import> {
        let (text, term) = self.scan(&[';', '}'])?;
        if term == Some(';') {
            self.pos += 1;
        }
        let mut rest = text.trim();

        let mut options = ImportOptions::default();
        if let Some(stripped) = rest.strip_prefix('(') {
            let Some(close) = stripped.find(')') else {
                return Err(self.error("missing `)` after import options", start));
            };
            for opt in stripped[..close].split(',') {
                match opt.trim() {
                    "reference" => options.reference = true,
                    "inline" => options.inline = true,
                    "less" => options.less = true,
                    "css" => options.css = true,
                    "optional" => options.optional = true,
                    "multiple" => options.multiple = true,
                    "once" => options.multiple = false,
                    "" => {}
                    other => {
                        return Err(self.error(format!("unknown import option `{other}`"), start));
                    }
                }
            }
            rest = stripped[close + 1..].trim_start();
        }

        let (target, raw_len) = if let Some(q) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let Some(end) = rest[1..].find(q) else {
                return Err(self.error("unterminated import path", start));
            };
            (rest[1..end + 1].to_string(), end + 2)
        } else if rest.get(..4).is_some_and(|s| s.eq_ignore_ascii_case("url(")) {
            let Some(close) = rest.find(')') else {
                return Err(self.error("missing `)` in import url", start));
            };
            let inner = rest[4..close].trim();
            let inner = inner
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(inner);
            (inner.to_string(), close + 1)
        } else {
            return Err(self.error("expected a quoted path or url() after @import", start));
        };

        if target.contains("@{") {
            return Err(self.error("variable interpolation in @import paths is not supported", start));
        }

        Ok(Import {
            options,
            target,
            raw_target: rest[..raw_len].to_string(),
            media: collapse_whitespace(rest[raw_len..].trim()),
            span,
        })
    }

    fn build_ruleset(&self, text: &str, body: Vec<Node>, span: Span, start: usize) -> Result<Ruleset> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.error("expected a selector before `{`", start));
        }

        let (selector_part, guard) = match find_keyword(text, "when") {
            Some(idx) => (
                text[..idx].trim(),
                Some(text[idx + "when".len()..].trim().to_string()),
            ),
            None => (text, None),
        };
        if is_extend(selector_part) {
            return Err(self.error("extend is not supported", start));
        }

        if let Some((name, inner)) = split_mixin_head(selector_part) {
            let params = parse_params(inner);
            return Ok(Ruleset {
                selectors: vec![name.to_string()],
                params: Some(params),
                guard,
                body,
                span,
            });
        }

        let selectors = split_top_level(selector_part, ',')
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Ruleset {
            selectors,
            params: None,
            guard,
            body,
            span,
        })
    }

    fn parse_mixin_call(&self, text: &str, span: Span, start: usize) -> Result<MixinCall> {
        let (text, important) = strip_important(text);
        let text = text.trim();

        let (selector, args) = match find_top_level(text, '(') {
            Some(open) => {
                if !text.ends_with(')') {
                    return Err(self.error(format!("unrecognised input `{text}`"), start));
                }
                (&text[..open], parse_args(&text[open + 1..text.len() - 1]))
            }
            None => (text, Vec::new()),
        };

        let path = split_mixin_path(selector);
        if path.is_empty() {
            return Err(self.error(format!("invalid mixin call `{text}`"), start));
        }

        Ok(MixinCall {
            path,
            args,
            important,
            span,
        })
    }
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Collapse runs of whitespace into single spaces.
/// `&:extend(.b);` or `.a:extend(.b) { .. }`.
fn is_extend(text: &str) -> bool {
    text.contains(":extend(")
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_important(text: &str) -> (&str, bool) {
    let trimmed = text.trim_end();
    let lower = trimmed.to_ascii_lowercase();
    if lower.ends_with("important") {
        let head = &trimmed[..trimmed.len() - "important".len()];
        let head = head.trim_end();
        if let Some(value) = head.strip_suffix('!') {
            return (value.trim_end(), true);
        }
    }
    (trimmed, false)
}

/// `.name(inner)` with nothing but name characters before the parenthesis.
fn split_mixin_head(text: &str) -> Option<(&str, &str)> {
    let first = text.chars().next()?;
    if first != '.' && first != '#' {
        return None;
    }
    let open = text.find('(')?;
    let name = text[..open].trim_end();
    if name.len() < 2 || !name[1..].chars().all(is_name_char) {
        return None;
    }
    if !text.ends_with(')') {
        return None;
    }
    // The first `(` must close at the very end.
    let inner = &text[open + 1..text.len() - 1];
    if find_top_level(inner, ')').is_some() {
        return None;
    }
    Some((name, inner))
}

/// Split a mixin call selector like `#ns > .m` or `#ns.m` into elements.
fn split_mixin_path(selector: &str) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = String::new();
    for c in selector.chars() {
        match c {
            '.' | '#' => {
                if !current.is_empty() {
                    path.push(std::mem::take(&mut current));
                }
                current.push(c);
            }
            '>' => {
                if !current.is_empty() {
                    path.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    path.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        path.push(current);
    }
    path.retain(|p| p.len() > 1);
    path
}

/// Split mixin parameters or arguments: `;` separates when present,
/// otherwise `,`.
fn split_arguments(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let separator = if find_top_level(inner, ';').is_some() {
        ';'
    } else {
        ','
    };
    split_top_level(inner, separator)
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_params(inner: &str) -> Vec<MixinParam> {
    split_arguments(inner)
        .into_iter()
        .map(|p| {
            if p == "..." {
                return MixinParam::Rest { name: None };
            }
            if let Some(name) = p.strip_prefix('@') {
                if let Some(rest) = name.strip_suffix("...") {
                    return MixinParam::Rest {
                        name: Some(rest.to_string()),
                    };
                }
                return match find_top_level(name, ':') {
                    Some(colon) => MixinParam::Variable {
                        name: name[..colon].trim().to_string(),
                        default: Some(name[colon + 1..].trim().to_string()),
                    },
                    None => MixinParam::Variable {
                        name: name.trim().to_string(),
                        default: None,
                    },
                };
            }
            MixinParam::Pattern(p)
        })
        .collect()
}

fn parse_args(inner: &str) -> Vec<MixinArg> {
    split_arguments(inner)
        .into_iter()
        .map(|a| {
            if let Some(name) = a.strip_prefix('@') {
                if let Some(colon) = find_top_level(name, ':') {
                    let key = name[..colon].trim();
                    if key.chars().all(is_name_char) {
                        return MixinArg {
                            name: Some(key.to_string()),
                            value: name[colon + 1..].trim().to_string(),
                        };
                    }
                }
            }
            MixinArg {
                name: None,
                value: a,
            }
        })
        .collect()
}

/// Byte index of the first `target` outside quotes and brackets.
pub(crate) fn find_top_level(text: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if depth == 0 && c == target {
            return Some(i);
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Split on `separator` outside quotes and brackets.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(idx) = find_top_level(rest, separator) {
        parts.push(rest[..idx].to_string());
        rest = &rest[idx + separator.len_utf8()..];
    }
    parts.push(rest.to_string());
    parts
}

/// Byte index of a whitespace-delimited `keyword` outside brackets.
pub(crate) fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && text[i..].starts_with(keyword) {
            let before_ok = i > 0 && (bytes[i - 1] as char).is_whitespace();
            let end = i + keyword.len();
            let after_ok = end < text.len() && (bytes[end] as char).is_whitespace()
                || text[end..].starts_with('(');
            if before_ok && after_ok {
                return Some(i);
            }
        }
    }
    None
}
