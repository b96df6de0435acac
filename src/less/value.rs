// src/less/value.rs

//! Expression values and the expression evaluator.
//!
//! Operators `+ - *` are evaluated everywhere; `/` only inside parentheses,
//! otherwise `a/b` is kept as written (`font: 12px/1.5`).

use std::cmp::Ordering;
use std::fmt;

use super::color::Color;
use super::error::{LessErrorKind, ValueError};
use super::functions;
use super::parser::{find_keyword, is_name_char, split_top_level};

type Result<T> = std::result::Result<T, ValueError>;

/// Variable lookup used while evaluating an expression.
pub trait Scope {
    fn variable(&mut self, name: &str) -> Result<Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub value: f64,
    pub unit: String,
}

impl Number {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Space,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Number),
    Color(Color),
    Keyword(String),
    Quoted {
        text: String,
        quote: char,
        /// `~"..."`: rendered without quotes.
        escaped: bool,
    },
    /// Complete `url(...)` text.
    Url(String),
    /// A function call left for the browser, e.g. `translate(1px, 2px)`.
    Call {
        name: String,
        args: Vec<Value>,
    },
    List {
        items: Vec<Value>,
        separator: Separator,
    },
    /// `a/b` outside parentheses.
    Slash(Box<Value>, Box<Value>),
}

impl Value {
    pub fn keyword(text: impl Into<String>) -> Self {
        Value::Keyword(text.into())
    }

    pub fn boolean(value: bool) -> Self {
        Value::Keyword(if value { "true" } else { "false" }.to_string())
    }

    /// Color value of a color literal or a named color keyword.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(c.clone()),
            Value::Keyword(k) => Color::from_name(k),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Rendered text with string quotes removed.
    pub fn unquoted(&self) -> String {
        match self {
            Value::Quoted { text, .. } => text.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}{}", fmt_number(n.value), n.unit),
            Value::Color(c) => f.write_str(&c.render()),
            Value::Keyword(k) => f.write_str(k),
            Value::Quoted {
                text,
                quote,
                escaped,
            } => {
                if *escaped {
                    f.write_str(text)
                } else {
                    write!(f, "{quote}{text}{quote}")
                }
            }
            Value::Url(u) => f.write_str(u),
            Value::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Value::List { items, separator } => {
                let sep = match separator {
                    Separator::Space => " ",
                    Separator::Comma => ", ",
                };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Slash(a, b) => write!(f, "{a}/{b}"),
        }
    }
}

/// Format a number the way Less prints it: integers without a fraction,
/// at most eight decimals otherwise.
pub(crate) fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        let int = value as i64;
        return int.to_string();
    }
    let text = format!("{value:.8}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Evaluate a value expression.
pub fn evaluate(text: &str, scope: &mut dyn Scope) -> Result<Value> {
    let toks = lex(text)?;
    let mut parser = ExprParser {
        toks,
        pos: 0,
        parens: 0,
        scope,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Ok(Value::keyword(""));
    }
    let value = parser.parse_comma_list()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(ValueError::new(
            LessErrorKind::Parse,
            format!("unexpected `)` in `{text}`"),
        ));
    }
    Ok(value)
}

/// Replace `@{name}` interpolations with the variable's unquoted value.
pub fn interpolate(text: &str, scope: &mut dyn Scope) -> Result<String> {
    substitute_impl(text, scope, false)
}

/// Replace both `@{name}` and bare `@name` references.
pub fn substitute(text: &str, scope: &mut dyn Scope) -> Result<String> {
    substitute_impl(text, scope, true)
}

fn substitute_impl(text: &str, scope: &mut dyn Scope, bare: bool) -> Result<String> {
    if !text.contains('@') {
        return Ok(text.to_string());
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '@' && chars.get(i + 1) == Some(&'{') {
            let Some(close) = chars[i..].iter().position(|c| *c == '}') else {
                return Err(ValueError::new(
                    LessErrorKind::Parse,
                    format!("unterminated interpolation in `{text}`"),
                ));
            };
            let name: String = chars[i + 2..i + close].iter().collect();
            out.push_str(&scope.variable(name.trim())?.unquoted());
            i += close + 1;
            continue;
        }
        if bare && c == '@' && chars.get(i + 1).is_some_and(|n| is_name_char(*n)) {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_name_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            out.push_str(&scope.variable(&name)?.unquoted());
            i = end;
            continue;
        }
        out.push(c);
        i += 1;
    }
    Ok(out)
}

/// Evaluate a mixin guard such as `(@a > 0) and not (iscolor(@b)), (@c)`.
pub fn evaluate_condition(text: &str, scope: &mut dyn Scope) -> Result<bool> {
    for alternative in split_top_level(text, ',') {
        if evaluate_conjunction(&alternative, scope)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn evaluate_conjunction(text: &str, scope: &mut dyn Scope) -> Result<bool> {
    let mut rest = text.trim();
    loop {
        match find_keyword(rest, "and") {
            Some(idx) => {
                if !evaluate_term(&rest[..idx], scope)? {
                    return Ok(false);
                }
                rest = rest[idx + "and".len()..].trim();
            }
            None => return evaluate_term(rest, scope),
        }
    }
}

fn evaluate_term(text: &str, scope: &mut dyn Scope) -> Result<bool> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("not") {
        if rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
            return Ok(!evaluate_term(rest, scope)?);
        }
    }
    let inner = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => inner,
        None => {
            return Err(ValueError::new(
                LessErrorKind::Parse,
                format!("guard condition `{text}` must be wrapped in parentheses"),
            ));
        }
    };

    match find_comparison(inner) {
        Some((idx, op)) => {
            let lhs = evaluate(&inner[..idx], scope)?;
            let rhs = evaluate(&inner[idx + op.len()..], scope)?;
            let ordering = compare(&lhs, &rhs);
            Ok(match op {
                "=" => ordering == Some(Ordering::Equal),
                ">" => ordering == Some(Ordering::Greater),
                "<" => ordering == Some(Ordering::Less),
                ">=" | "=>" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                _ => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            })
        }
        None => {
            let value = evaluate(inner, scope)?;
            Ok(matches!(value, Value::Keyword(ref k) if k == "true"))
        }
    }
}

fn find_comparison(text: &str) -> Option<(usize, &'static str)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '<' | '>' | '=' if depth == 0 => {
                let rest = &text[i..];
                for op in [">=", "=<", "<=", "=>", ">", "<", "="] {
                    if rest.starts_with(op) {
                        return Some((i, op));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.value.partial_cmp(&y.value),
        _ => match (a.as_color(), b.as_color()) {
            (Some(x), Some(y)) => {
                let same = channels(&x) == channels(&y);
                same.then_some(Ordering::Equal)
            }
            _ => (a.unquoted() == b.unquoted()).then_some(Ordering::Equal),
        },
    }
}

fn channels(c: &Color) -> (i64, i64, i64, i64) {
    (
        c.r.round() as i64,
        c.g.round() as i64,
        c.b.round() as i64,
        (c.a * 1000.0).round() as i64,
    )
}

/// Apply a binary arithmetic operator.
pub fn operate(op: char, a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let unit = if x.unit.is_empty() {
                y.unit.clone()
            } else {
                x.unit.clone()
            };
            let value = match op {
                '+' => x.value + y.value,
                '-' => x.value - y.value,
                '*' => x.value * y.value,
                _ => {
                    if y.value == 0.0 {
                        return Err(ValueError::new(
                            LessErrorKind::Operation,
                            format!("division by zero in `{a} / {b}`"),
                        ));
                    }
                    x.value / y.value
                }
            };
            Ok(Value::Number(Number::new(value, unit)))
        }
        (Value::Number(n), other) | (other, Value::Number(n)) if other.as_color().is_some() => {
            let color = other.as_color().unwrap_or_else(|| Color::rgba(0.0, 0.0, 0.0, 1.0));
            let number_first = matches!(a, Value::Number(_));
            let apply = |c: f64| {
                if number_first {
                    arithmetic(op, n.value, c)
                } else {
                    arithmetic(op, c, n.value)
                }
            };
            Ok(Value::Color(Color::rgba(
                apply(color.r),
                apply(color.g),
                apply(color.b),
                color.a,
            )))
        }
        _ => match (a.as_color(), b.as_color()) {
            (Some(x), Some(y)) => {
                if op == '/' && (y.r == 0.0 || y.g == 0.0 || y.b == 0.0) {
                    return Err(ValueError::new(
                        LessErrorKind::Operation,
                        format!("division by zero in `{a} / {b}`"),
                    ));
                }
                Ok(Value::Color(Color::rgba(
                    arithmetic(op, x.r, y.r),
                    arithmetic(op, x.g, y.g),
                    arithmetic(op, x.b, y.b),
                    x.a,
                )))
            }
            _ => Err(ValueError::new(
                LessErrorKind::Operation,
                format!("cannot apply `{op}` to `{a}` and `{b}`"),
            )),
        },
    }
}

fn arithmetic(op: char, a: f64, b: f64) -> f64 {
    match op {
        '+' => a + b,
        '-' => a - b,
        '*' => a * b,
        _ => a / b,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64, String),
    Hash(String),
    Ident(String),
    Str {
        text: String,
        quote: char,
        escaped: bool,
    },
    Var(String),
    Interp(String),
    Url(String),
    /// Functions whose arguments are not Less expressions, e.g. `calc`.
    RawCall(String, String),
    Func(String),
    LParen,
    RParen,
    Comma,
    Ws,
    Op(char),
    Other(String),
}

const RAW_FUNCTIONS: &[&str] = &["calc", "-webkit-calc", "-moz-calc", "var", "env"];

fn lex(text: &str) -> Result<Vec<Tok>> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut toks: Vec<Tok> = Vec::new();
    let mut i = 0;

    let is_ident_start = |c: char| c.is_alphabetic() || c == '_' || c == '-' || !c.is_ascii();

    while i < len {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let operand_expected = matches!(
            toks.last(),
            None | Some(Tok::Ws | Tok::LParen | Tok::Comma | Tok::Op(_))
        );

        if c.is_whitespace() {
            while i < len && chars[i].is_whitespace() {
                i += 1;
            }
            if !matches!(toks.last(), Some(Tok::Ws)) {
                toks.push(Tok::Ws);
            }
            continue;
        }

        let starts_number = |at: usize| {
            chars.get(at).is_some_and(|c| c.is_ascii_digit())
                || (chars.get(at) == Some(&'.')
                    && chars.get(at + 1).is_some_and(|c| c.is_ascii_digit()))
        };

        if starts_number(i) || (c == '-' && operand_expected && starts_number(i + 1)) {
            let start = i;
            if c == '-' {
                i += 1;
            }
            while i < len && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < len && chars[i] == '.' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
                while i < len && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let number: String = chars[start..i].iter().collect();
            let value: f64 = number.parse().map_err(|_| {
                ValueError::new(LessErrorKind::Parse, format!("invalid number `{number}`"))
            })?;
            let unit_start = i;
            if i < len && chars[i] == '%' {
                i += 1;
            } else {
                while i < len && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
            }
            let unit: String = chars[unit_start..i].iter().collect();
            toks.push(Tok::Num(value, unit));
            continue;
        }

        match c {
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            ',' => {
                toks.push(Tok::Comma);
                i += 1;
            }
            '+' | '*' | '/' => {
                toks.push(Tok::Op(c));
                i += 1;
            }
            '-' if !(operand_expected && next.is_some_and(is_ident_start)) => {
                toks.push(Tok::Op('-'));
                i += 1;
            }
            '"' | '\'' => {
                let (text, end) = read_string(&chars, i)?;
                toks.push(Tok::Str {
                    text,
                    quote: c,
                    escaped: false,
                });
                i = end;
            }
            '~' if matches!(next, Some('"') | Some('\'')) => {
                let (text, end) = read_string(&chars, i + 1)?;
                toks.push(Tok::Str {
                    text,
                    quote: chars[i + 1],
                    escaped: true,
                });
                i = end;
            }
            '@' => {
                if next == Some('{') {
                    let Some(close) = chars[i..].iter().position(|c| *c == '}') else {
                        return Err(ValueError::new(
                            LessErrorKind::Parse,
                            format!("unterminated interpolation in `{text}`"),
                        ));
                    };
                    toks.push(Tok::Interp(chars[i + 2..i + close].iter().collect()));
                    i += close + 1;
                } else {
                    let mut start = i + 1;
                    let mut prefix = String::new();
                    if next == Some('@') {
                        prefix.push('@');
                        start += 1;
                    }
                    let mut end = start;
                    while end < len && is_name_char(chars[end]) {
                        end += 1;
                    }
                    if end == start {
                        toks.push(Tok::Other("@".to_string()));
                        i += 1;
                    } else {
                        let name: String = chars[start..end].iter().collect();
                        toks.push(Tok::Var(format!("{prefix}{name}")));
                        i = end;
                    }
                }
            }
            '#' => {
                let mut end = i + 1;
                while end < len && is_name_char(chars[end]) {
                    end += 1;
                }
                toks.push(Tok::Hash(chars[i..end].iter().collect()));
                i = end;
            }
            'u' | 'U' if next == Some('+') && chars.get(i + 2).is_some_and(|c| c.is_ascii_hexdigit() || *c == '?') => {
                let mut end = i + 2;
                while end < len && (chars[end].is_ascii_hexdigit() || matches!(chars[end], '?' | '-')) {
                    end += 1;
                }
                toks.push(Tok::Ident(chars[i..end].iter().collect()));
                i = end;
            }
            c if is_ident_start(c) => {
                let mut end = i + 1;
                while end < len && (is_name_char(chars[end]) || !chars[end].is_ascii()) {
                    end += 1;
                }
                let name: String = chars[i..end].iter().collect();
                if chars.get(end) == Some(&'(') {
                    let lower = name.to_ascii_lowercase();
                    if lower == "url" || RAW_FUNCTIONS.contains(&lower.as_str()) {
                        let close = find_closing_paren(&chars, end).ok_or_else(|| {
                            ValueError::new(
                                LessErrorKind::Parse,
                                format!("missing `)` after `{name}(`"),
                            )
                        })?;
                        let inner: String = chars[end + 1..close].iter().collect();
                        if lower == "url" {
                            toks.push(Tok::Url(inner));
                        } else {
                            toks.push(Tok::RawCall(name, inner));
                        }
                        i = close + 1;
                    } else {
                        toks.push(Tok::Func(name));
                        i = end + 1;
                    }
                } else {
                    toks.push(Tok::Ident(name));
                    i = end;
                }
            }
            '!' => {
                let mut end = i + 1;
                while end < len && is_name_char(chars[end]) {
                    end += 1;
                }
                toks.push(Tok::Other(chars[i..end].iter().collect()));
                i = end;
            }
            '\\' => {
                let end = (i + 2).min(len);
                toks.push(Tok::Other(chars[i..end].iter().collect()));
                i = end;
            }
            other => {
                toks.push(Tok::Other(other.to_string()));
                i += 1;
            }
        }
    }

    if matches!(toks.last(), Some(Tok::Ws)) {
        toks.pop();
    }
    Ok(toks)
}

/// Read a quoted string starting at `start`; returns the inner text and the
/// position just past the closing quote.
fn read_string(chars: &[char], start: usize) -> Result<(String, usize)> {
    let quote = chars[start];
    let mut i = start + 1;
    let mut text = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            text.push(c);
            if let Some(next) = chars.get(i + 1) {
                text.push(*next);
            }
            i += 2;
            continue;
        }
        if c == quote {
            return Ok((text, i + 1));
        }
        text.push(c);
        i += 1;
    }
    Err(ValueError::new(LessErrorKind::Parse, "unterminated string"))
}

fn find_closing_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in chars.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if *c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(*c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

struct ExprParser<'s> {
    toks: Vec<Tok>,
    pos: usize,
    parens: usize,
    scope: &'s mut dyn Scope,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn skip_ws(&mut self) -> bool {
        let mut skipped = false;
        while matches!(self.peek(), Some(Tok::Ws)) {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    fn at_list_boundary(&self) -> bool {
        matches!(self.peek(), None | Some(Tok::Comma | Tok::RParen))
    }

    fn parse_comma_list(&mut self) -> Result<Value> {
        let mut items = vec![self.parse_space_list()?];
        while matches!(self.peek(), Some(Tok::Comma)) {
            self.pos += 1;
            items.push(self.parse_space_list()?);
        }
        Ok(collapse(items, Separator::Comma))
    }

    fn parse_space_list(&mut self) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.at_list_boundary() {
                break;
            }
            items.push(self.parse_juxtaposed()?);
        }
        if items.is_empty() {
            return Ok(Value::keyword(""));
        }
        Ok(collapse(items, Separator::Space))
    }

    /// Operands written back to back without whitespace, such as
    /// `opacity=50`, are glued into one keyword.
    fn parse_juxtaposed(&mut self) -> Result<Value> {
        let mut value = self.parse_additive()?;
        while !matches!(self.peek(), None | Some(Tok::Ws | Tok::Comma | Tok::RParen)) {
            let next = self.parse_additive()?;
            value = Value::Keyword(format!("{value}{next}"));
        }
        Ok(value)
    }

    fn parse_additive(&mut self) -> Result<Value> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let save = self.pos;
            let ws_before = self.skip_ws();
            let op = match self.peek() {
                Some(Tok::Op(op @ ('+' | '-'))) => *op,
                _ => {
                    self.pos = save;
                    break;
                }
            };
            let ws_after = matches!(self.toks.get(self.pos + 1), Some(Tok::Ws));
            if ws_before && !ws_after {
                // `a -b` is a list of two values.
                self.pos = save;
                break;
            }
            self.pos += 1;
            self.skip_ws();
            let right = self.parse_multiplicative()?;
            left = operate(op, &left, &right)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Value> {
        let mut left = self.parse_unary()?;
        loop {
            let save = self.pos;
            let ws_before = self.skip_ws();
            match self.peek() {
                Some(Tok::Op('*')) => {
                    self.pos += 1;
                    self.skip_ws();
                    let right = self.parse_unary()?;
                    left = operate('*', &left, &right)?;
                }
                Some(Tok::Op('/')) if self.parens > 0 => {
                    self.pos += 1;
                    self.skip_ws();
                    let right = self.parse_unary()?;
                    left = operate('/', &left, &right)?;
                }
                Some(Tok::Op('/')) if !ws_before => {
                    self.pos += 1;
                    if matches!(self.peek(), None | Some(Tok::Ws | Tok::Comma | Tok::RParen)) {
                        left = Value::Keyword(format!("{left}/"));
                        break;
                    }
                    let right = self.parse_unary()?;
                    left = Value::Slash(Box::new(left), Box::new(right));
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Value> {
        if matches!(self.peek(), Some(Tok::Op('-')))
            && !matches!(self.toks.get(self.pos + 1), None | Some(Tok::Ws))
        {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(match operand {
                Value::Number(n) => Value::Number(Number::new(-n.value, n.unit)),
                other => Value::Keyword(format!("-{other}")),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Value> {
        let Some(tok) = self.peek().cloned() else {
            return Err(ValueError::new(LessErrorKind::Parse, "expected a value"));
        };
        self.pos += 1;
        match tok {
            Tok::Num(value, unit) => Ok(Value::Number(Number::new(value, unit))),
            Tok::Hash(text) => Ok(Color::from_hex(&text)
                .map(Value::Color)
                .unwrap_or(Value::Keyword(text))),
            Tok::Ident(name) => Ok(Value::Keyword(name)),
            Tok::Str {
                text,
                quote,
                escaped,
            } => Ok(Value::Quoted {
                text: interpolate(&text, &mut *self.scope)?,
                quote,
                escaped,
            }),
            Tok::Var(name) => self.scope.variable(&name),
            Tok::Interp(name) => Ok(Value::Keyword(self.scope.variable(name.trim())?.unquoted())),
            Tok::Url(inner) => self.url(&inner),
            Tok::RawCall(name, inner) => {
                let inner = substitute(&inner, &mut *self.scope)?;
                Ok(Value::Keyword(format!("{name}({inner})")))
            }
            Tok::Func(name) => {
                let args = self.parse_arguments()?;
                functions::call(&name, args)
            }
            Tok::LParen => {
                self.parens += 1;
                self.skip_ws();
                let value = self.parse_comma_list()?;
                self.skip_ws();
                self.parens -= 1;
                if !matches!(self.peek(), Some(Tok::RParen)) {
                    return Err(ValueError::new(LessErrorKind::Parse, "missing closing `)`"));
                }
                self.pos += 1;
                Ok(value)
            }
            Tok::Op(op) => Ok(Value::Keyword(op.to_string())),
            Tok::Other(text) => Ok(Value::Keyword(text)),
            Tok::RParen | Tok::Comma | Tok::Ws => {
                Err(ValueError::new(LessErrorKind::Parse, "expected a value"))
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Value>> {
        let mut args = Vec::new();
        self.skip_ws();
        if matches!(self.peek(), Some(Tok::RParen)) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.parse_space_list()?);
            self.skip_ws();
            match self.peek() {
                Some(Tok::Comma) => self.pos += 1,
                Some(Tok::RParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => {
                    return Err(ValueError::new(
                        LessErrorKind::Parse,
                        "missing `)` after function arguments",
                    ));
                }
            }
        }
    }

    fn url(&mut self, inner: &str) -> Result<Value> {
        let trimmed = inner.trim();
        if trimmed.starts_with('@') && !trimmed.starts_with("@{") {
            let value = evaluate(trimmed, &mut *self.scope)?;
            return Ok(Value::Url(format!("url({value})")));
        }
        Ok(Value::Url(format!("url({})", interpolate(trimmed, &mut *self.scope)?)))
    }
}

fn collapse(mut items: Vec<Value>, separator: Separator) -> Value {
    if items.len() == 1 {
        return items.remove(0);
    }
    Value::List { items, separator }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Vars(HashMap<String, String>);

    impl Scope for Vars {
        fn variable(&mut self, name: &str) -> Result<Value> {
            let text = self.0.get(name).cloned().ok_or_else(|| {
                ValueError::new(LessErrorKind::Name, format!("variable @{name} is undefined"))
            })?;
            evaluate(&text, self)
        }
    }

    fn eval(text: &str) -> String {
        let mut vars = Vars(HashMap::from([
            ("w".to_string(), "10px".to_string()),
            ("c".to_string(), "#336699".to_string()),
            ("name".to_string(), "\"box\"".to_string()),
        ]));
        evaluate(text, &mut vars).unwrap().to_string()
    }

    #[test]
    fn arithmetic_propagates_units() {
        assert_eq!(eval("@w * 2"), "20px");
        assert_eq!(eval("@w + 5"), "15px");
        assert_eq!(eval("(@w / 4)"), "2.5px");
        assert_eq!(eval("10px-4px"), "6px");
    }

    #[test]
    fn slash_outside_parentheses_is_kept() {
        assert_eq!(eval("12px/1.5 Arial, sans-serif"), "12px/1.5 Arial, sans-serif");
    }

    #[test]
    fn negative_values_in_lists_are_not_subtracted() {
        assert_eq!(eval("0 -1px 2px"), "0 -1px 2px");
        assert_eq!(eval("-@w"), "-10px");
    }

    #[test]
    fn color_arithmetic() {
        assert_eq!(eval("#111 + #222"), "#333333");
        assert_eq!(eval("@c * 2"), "#66ccff");
    }

    #[test]
    fn strings_and_urls_interpolate() {
        assert_eq!(eval("\"@{name}-title\""), "\"box-title\"");
        assert_eq!(eval("~\"@{name}\""), "box");
        assert_eq!(eval("url(\"img/@{name}.png\")"), "url(\"img/box.png\")");
    }

    #[test]
    fn calc_only_substitutes_variables() {
        assert_eq!(eval("calc(100% - @w)"), "calc(100% - 10px)");
    }

    #[test]
    fn guards_compare_numbers() {
        let mut vars = Vars(HashMap::from([("a".to_string(), "5".to_string())]));
        assert!(evaluate_condition("(@a > 2) and (@a < 10)", &mut vars).unwrap());
        assert!(!evaluate_condition("(@a = 4)", &mut vars).unwrap());
        assert!(evaluate_condition("(@a = 4), not (@a < 1)", &mut vars).unwrap());
    }

    #[test]
    fn formats_numbers_like_less() {
        assert_eq!(fmt_number(3.0), "3");
        assert_eq!(fmt_number(0.5), "0.5");
        assert_eq!(fmt_number(1.0 / 3.0), "0.33333333");
    }

    #[test]
    fn undefined_variable_is_a_name_error() {
        let mut vars = Vars(HashMap::new());
        let err = evaluate("@missing", &mut vars).unwrap_err();
        assert_eq!(err.kind, LessErrorKind::Name);
    }
}
