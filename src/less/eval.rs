// src/less/eval.rs

//! Evaluation of a resolved syntax tree into flat CSS entries.
//!
//! Variables are lazy: a scope frame maps names to their raw definition
//! text, evaluated on lookup against the frames visible at the point of
//! definition. The last definition in a frame wins.

use std::collections::HashMap;
use std::path::Path;

use super::ast::{AtRule, MixinCall, MixinParam, Node, Ruleset};
use super::css::{CssNode, Declaration, Entry, Wrapper};
use super::error::{LessError, LessErrorKind, ValueError};
use super::parser::is_name_char;
use super::selector;
use super::value::{self, Scope, Separator, Value};

type Result<T> = std::result::Result<T, LessError>;

/// Nesting limit for mixin expansion, including guarded recursion.
const MAX_MIXIN_DEPTH: usize = 256;

pub fn evaluate(nodes: &[Node], file: &Path) -> Result<Vec<Entry>> {
    let mut evaluator = Evaluator::default();
    let mut root = Frame::default();
    build_frame(nodes, file, &mut root);
    evaluator.frames.push(root);

    let mut out = Vec::new();
    let mut stray = Vec::new();
    evaluator.eval_nodes(nodes, file, &Context::root(), &mut stray, &mut out)?;
    Ok(out)
}

#[derive(Debug, Clone)]
enum VarDef<'a> {
    Raw(&'a str),
    Value(Value),
}

#[derive(Debug, Clone, Default)]
struct Frame<'a> {
    vars: HashMap<String, VarDef<'a>>,
    mixins: HashMap<String, Vec<MixinDef<'a>>>,
}

#[derive(Debug, Clone, Copy)]
struct MixinDef<'a> {
    ruleset: &'a Ruleset,
    file: &'a Path,
}

struct Candidate<'a> {
    def: MixinDef<'a>,
    /// Scopes of the namespaces the mixin was found through.
    namespaces: Vec<Frame<'a>>,
}

#[derive(Debug, Clone)]
struct Context {
    selectors: Vec<String>,
    wrappers: Vec<Wrapper>,
    in_rule: bool,
    important: bool,
}

impl Context {
    fn root() -> Self {
        Self {
            selectors: Vec::new(),
            wrappers: Vec::new(),
            in_rule: false,
            important: false,
        }
    }
}

#[derive(Default)]
struct Evaluator<'a> {
    frames: Vec<Frame<'a>>,
    /// Variables currently being evaluated, as (frame index, name).
    resolving: Vec<(usize, String)>,
    /// Addresses of the mixin rulesets currently being expanded.
    mixin_stack: Vec<usize>,
}

struct Lookup<'e, 'a> {
    evaluator: &'e mut Evaluator<'a>,
    upto: usize,
}

impl Scope for Lookup<'_, '_> {
    fn variable(&mut self, name: &str) -> std::result::Result<Value, ValueError> {
        self.evaluator.lookup(name, self.upto)
    }
}

fn build_frame<'a>(nodes: &'a [Node], file: &'a Path, frame: &mut Frame<'a>) {
    for node in nodes {
        match node {
            Node::Variable { name, value, .. } => {
                frame.vars.insert(name.clone(), VarDef::Raw(value));
            }
            Node::Ruleset(rs) => {
                for sel in &rs.selectors {
                    if is_mixin_name(sel) {
                        frame
                            .mixins
                            .entry(sel.clone())
                            .or_default()
                            .push(MixinDef { ruleset: rs, file });
                    }
                }
            }
            Node::Imported {
                file: imported,
                nodes,
                ..
            } => build_frame(nodes, imported, frame),
            _ => {}
        }
    }
}

fn is_mixin_name(selector: &str) -> bool {
    let mut chars = selector.chars();
    matches!(chars.next(), Some('.') | Some('#'))
        && selector.len() > 1
        && chars.all(is_name_char)
}

impl<'a> Evaluator<'a> {
    fn lookup(&mut self, name: &str, upto: usize) -> std::result::Result<Value, ValueError> {
        if let Some(inner) = name.strip_prefix('@') {
            let target = self.lookup(inner, upto)?.unquoted();
            return self.lookup(target.trim_start_matches('@'), upto);
        }

        for index in (0..upto.min(self.frames.len())).rev() {
            let text = match self.frames[index].vars.get(name) {
                Some(VarDef::Value(v)) => return Ok(v.clone()),
                Some(VarDef::Raw(text)) => *text,
                None => continue,
            };

            let key = (index, name.to_string());
            if self.resolving.contains(&key) {
                return Err(ValueError::new(
                    LessErrorKind::Recursion,
                    format!("recursive variable definition for @{name}"),
                ));
            }
            self.resolving.push(key);
            let result = value::evaluate(
                text,
                &mut Lookup {
                    evaluator: self,
                    upto: index + 1,
                },
            );
            self.resolving.pop();
            return result;
        }

        Err(ValueError::new(
            LessErrorKind::Name,
            format!("variable @{name} is undefined"),
        ))
    }

    fn scope(&mut self) -> Lookup<'_, 'a> {
        let upto = self.frames.len();
        Lookup {
            evaluator: self,
            upto,
        }
    }

    fn eval_value(&mut self, text: &str) -> std::result::Result<Value, ValueError> {
        value::evaluate(text, &mut self.scope())
    }

    fn interpolate(&mut self, text: &str) -> std::result::Result<String, ValueError> {
        value::interpolate(text, &mut self.scope())
    }

    fn substitute(&mut self, text: &str) -> std::result::Result<String, ValueError> {
        value::substitute(text, &mut self.scope())
    }

    fn condition(&mut self, text: &str) -> std::result::Result<bool, ValueError> {
        value::evaluate_condition(text, &mut self.scope())
    }

    fn push_scope(&mut self, body: &'a [Node], file: &'a Path) {
        let mut frame = Frame::default();
        build_frame(body, file, &mut frame);
        self.frames.push(frame);
    }

    fn eval_nodes(
        &mut self,
        nodes: &'a [Node],
        file: &'a Path,
        ctx: &Context,
        decls: &mut Vec<Declaration>,
        out: &mut Vec<Entry>,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Comment(text) => {
                    if !ctx.in_rule {
                        out.push(Entry::new(
                            ctx.wrappers.clone(),
                            CssNode::Comment(text.clone()),
                        ));
                    }
                }
                Node::Variable { .. } => {}
                Node::Declaration {
                    name,
                    value,
                    important,
                    span,
                } => {
                    if !ctx.in_rule {
                        return Err(LessError::new(
                            LessErrorKind::Parse,
                            format!("property `{name}` must be inside a selector block"),
                            file,
                            *span,
                        ));
                    }
                    let name = self.interpolate(name).map_err(|e| e.at(file, *span))?;
                    let mut rendered = if name.starts_with("--") {
                        self.interpolate(value)
                    } else {
                        self.eval_value(value).map(|v| v.to_string())
                    }
                    .map_err(|e| e.at(file, *span))?;
                    if *important || ctx.important {
                        rendered.push_str(" !important");
                    }
                    decls.push(Declaration {
                        name,
                        value: rendered,
                    });
                }
                Node::Ruleset(rs) => self.ruleset(rs, file, ctx, out)?,
                Node::MixinCall(call) => self.mixin_call(call, file, ctx, decls, out)?,
                Node::AtRule(at) => self.at_rule(at, file, ctx, out)?,
                Node::Imported {
                    file: imported,
                    reference,
                    nodes,
                } => {
                    if !*reference {
                        self.eval_nodes(nodes, imported, ctx, decls, out)?;
                    }
                }
                Node::CssImport { text } => {
                    out.push(Entry::new(Vec::new(), CssNode::Import(text.clone())));
                }
                Node::InlineCss(text) => {
                    out.push(Entry::new(ctx.wrappers.clone(), CssNode::Raw(text.clone())));
                }
                Node::Import(import) => {
                    return Err(LessError::new(
                        LessErrorKind::Import,
                        format!("unresolved import `{}`", import.target),
                        file,
                        import.span,
                    ));
                }
            }
        }
        Ok(())
    }

    fn ruleset(
        &mut self,
        rs: &'a Ruleset,
        file: &'a Path,
        ctx: &Context,
        out: &mut Vec<Entry>,
    ) -> Result<()> {
        if rs.is_parametric() {
            return Ok(());
        }
        if let Some(guard) = &rs.guard {
            if !self.condition(guard).map_err(|e| e.at(file, rs.span))? {
                return Ok(());
            }
        }

        let mut own = Vec::with_capacity(rs.selectors.len());
        for sel in &rs.selectors {
            own.push(self.interpolate(sel).map_err(|e| e.at(file, rs.span))?);
        }
        let selectors = selector::join(&ctx.selectors, &own);

        let index = out.len();
        out.push(Entry::new(
            ctx.wrappers.clone(),
            CssNode::Rule {
                selectors: selectors.clone(),
                declarations: Vec::new(),
            },
        ));

        let child = Context {
            selectors,
            in_rule: true,
            ..ctx.clone()
        };
        let mut declarations = Vec::new();
        self.push_scope(&rs.body, file);
        let result = self.eval_nodes(&rs.body, file, &child, &mut declarations, out);
        self.frames.pop();
        result?;

        if let CssNode::Rule {
            declarations: slot, ..
        } = &mut out[index].node
        {
            *slot = declarations;
        }
        Ok(())
    }

    fn mixin_call(
        &mut self,
        call: &'a MixinCall,
        file: &'a Path,
        ctx: &Context,
        decls: &mut Vec<Declaration>,
        out: &mut Vec<Entry>,
    ) -> Result<()> {
        let name = call.path.join(" > ");
        let candidates = self.find_mixins(&call.path);
        if candidates.is_empty() {
            return Err(LessError::new(
                LessErrorKind::Name,
                format!("{name} is undefined"),
                file,
                call.span,
            ));
        }
        if self.mixin_stack.len() >= MAX_MIXIN_DEPTH {
            return Err(LessError::new(
                LessErrorKind::Recursion,
                format!("maximum mixin nesting exceeded while calling {name}"),
                file,
                call.span,
            ));
        }

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let value = self
                .eval_value(&arg.value)
                .map_err(|e| e.at(file, call.span))?;
            args.push((arg.name.clone(), value));
        }

        let mut matched = false;
        for candidate in candidates {
            let rs = candidate.def.ruleset;
            let Some(params) = bind(rs, &args) else {
                continue;
            };
            let key = rs as *const Ruleset as usize;
            if !rs.is_parametric() && self.mixin_stack.contains(&key) {
                return Err(LessError::new(
                    LessErrorKind::Recursion,
                    format!("{name} calls itself"),
                    file,
                    call.span,
                ));
            }

            let base = self.frames.len();
            self.frames.extend(candidate.namespaces);
            self.frames.push(params);
            let result = self.expand_mixin(candidate.def, ctx, call.important, decls, out);
            self.frames.truncate(base);
            result?;
            matched = true;
        }

        if !matched {
            return Err(LessError::new(
                LessErrorKind::Argument,
                format!("no matching definition was found for {name}"),
                file,
                call.span,
            ));
        }
        Ok(())
    }

    /// Expand one mixin definition whose parameters are already bound in
    /// the top frame. A failing guard expands to nothing.
    fn expand_mixin(
        &mut self,
        def: MixinDef<'a>,
        ctx: &Context,
        important: bool,
        decls: &mut Vec<Declaration>,
        out: &mut Vec<Entry>,
    ) -> Result<()> {
        let rs = def.ruleset;

        if let Some(params) = &rs.params {
            let arguments = self
                .bound_arguments(params)
                .map_err(|e| e.at(def.file, rs.span))?;
            if let Some(top) = self.frames.last_mut() {
                top.vars
                    .insert("arguments".to_string(), VarDef::Value(arguments));
            }
        }

        if let Some(guard) = &rs.guard {
            if !self.condition(guard).map_err(|e| e.at(def.file, rs.span))? {
                return Ok(());
            }
        }

        let child = Context {
            important: ctx.important || important,
            ..ctx.clone()
        };
        self.push_scope(&rs.body, def.file);
        self.mixin_stack.push(rs as *const Ruleset as usize);
        let result = self.eval_nodes(&rs.body, def.file, &child, decls, out);
        self.mixin_stack.pop();
        self.frames.pop();
        result
    }

    fn bound_arguments(&mut self, params: &[MixinParam]) -> std::result::Result<Value, ValueError> {
        let mut items = Vec::new();
        for param in params {
            let name = match param {
                MixinParam::Variable { name, .. } => name,
                MixinParam::Rest { name: Some(name) } => name,
                _ => continue,
            };
            match self.lookup(name, self.frames.len())? {
                Value::List {
                    items: rest,
                    separator: Separator::Space,
                } if matches!(param, MixinParam::Rest { .. }) => items.extend(rest),
                value => items.push(value),
            }
        }
        Ok(match items.len() {
            1 => items.remove(0),
            _ => Value::List {
                items,
                separator: Separator::Space,
            },
        })
    }

    fn find_mixins(&self, path: &[String]) -> Vec<Candidate<'a>> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };

        let mut found: Vec<Candidate<'a>> = Vec::new();
        for frame in self.frames.iter().rev() {
            if let Some(defs) = frame.mixins.get(first) {
                found = defs
                    .iter()
                    .map(|def| Candidate {
                        def: *def,
                        namespaces: Vec::new(),
                    })
                    .collect();
                break;
            }
        }

        for segment in rest {
            let mut next = Vec::new();
            for candidate in &found {
                let mut frame = Frame::default();
                build_frame(&candidate.def.ruleset.body, candidate.def.file, &mut frame);
                let Some(defs) = frame.mixins.get(segment).cloned() else {
                    continue;
                };
                for def in defs {
                    let mut namespaces = candidate.namespaces.clone();
                    namespaces.push(frame.clone());
                    next.push(Candidate { def, namespaces });
                }
            }
            found = next;
        }
        found
    }

    fn at_rule(
        &mut self,
        at: &'a AtRule,
        file: &'a Path,
        ctx: &Context,
        out: &mut Vec<Entry>,
    ) -> Result<()> {
        let prelude = self
            .substitute(&at.prelude)
            .map_err(|e| e.at(file, at.span))?;

        let Some(body) = &at.body else {
            out.push(Entry::new(
                ctx.wrappers.clone(),
                CssNode::AtRule {
                    name: at.name.clone(),
                    prelude,
                    declarations: Vec::new(),
                    children: Vec::new(),
                    has_body: false,
                },
            ));
            return Ok(());
        };

        self.push_scope(body, file);
        let result = if at.bubbles() {
            self.bubble(at, body, prelude, file, ctx, out)
        } else {
            self.nested_block(at, body, prelude, file, ctx, out)
        };
        self.frames.pop();
        result
    }

    /// `@media` and friends: the enclosing selectors move inside, the
    /// rule itself becomes a wrapper of everything it contains.
    fn bubble(
        &mut self,
        at: &'a AtRule,
        body: &'a [Node],
        prelude: String,
        file: &'a Path,
        ctx: &Context,
        out: &mut Vec<Entry>,
    ) -> Result<()> {
        let mut wrappers = ctx.wrappers.clone();
        wrappers.push(Wrapper {
            name: at.name.clone(),
            prelude,
        });
        let child = Context {
            wrappers: wrappers.clone(),
            ..ctx.clone()
        };

        if !ctx.in_rule {
            let mut stray = Vec::new();
            return self.eval_nodes(body, file, &child, &mut stray, out);
        }

        let index = out.len();
        out.push(Entry::new(
            wrappers,
            CssNode::Rule {
                selectors: ctx.selectors.clone(),
                declarations: Vec::new(),
            },
        ));
        let mut declarations = Vec::new();
        self.eval_nodes(body, file, &child, &mut declarations, out)?;
        if let CssNode::Rule {
            declarations: slot, ..
        } = &mut out[index].node
        {
            *slot = declarations;
        }
        Ok(())
    }

    /// `@font-face`, `@keyframes`, `@page`: evaluated in isolation and
    /// emitted as one block.
    fn nested_block(
        &mut self,
        at: &'a AtRule,
        body: &'a [Node],
        prelude: String,
        file: &'a Path,
        ctx: &Context,
        out: &mut Vec<Entry>,
    ) -> Result<()> {
        let inner = Context {
            selectors: Vec::new(),
            wrappers: Vec::new(),
            in_rule: true,
            important: false,
        };
        let mut declarations = Vec::new();
        let mut children = Vec::new();
        self.eval_nodes(body, file, &inner, &mut declarations, &mut children)?;
        out.push(Entry::new(
            ctx.wrappers.clone(),
            CssNode::AtRule {
                name: at.name.clone(),
                prelude,
                declarations,
                children,
                has_body: true,
            },
        ));
        Ok(())
    }
}

/// Bind call arguments to a definition's parameters. `None` when the
/// definition does not accept the call.
fn bind<'a>(rs: &'a Ruleset, args: &[(Option<String>, Value)]) -> Option<Frame<'a>> {
    let mut frame = Frame::default();
    let Some(params) = &rs.params else {
        return args.is_empty().then_some(frame);
    };

    let positional: Vec<&Value> = args
        .iter()
        .filter(|(name, _)| name.is_none())
        .map(|(_, v)| v)
        .collect();
    let named = args.iter().filter(|(name, _)| name.is_some()).count();

    let mut next = 0;
    let mut used_named = 0;
    let mut has_rest = false;

    for param in params {
        match param {
            MixinParam::Variable { name, default } => {
                if let Some((_, v)) = args.iter().find(|(n, _)| n.as_deref() == Some(name.as_str())) {
                    frame.vars.insert(name.clone(), VarDef::Value(v.clone()));
                    used_named += 1;
                } else if let Some(v) = positional.get(next) {
                    frame.vars.insert(name.clone(), VarDef::Value((*v).clone()));
                    next += 1;
                } else if let Some(default) = default {
                    frame.vars.insert(name.clone(), VarDef::Raw(default));
                } else {
                    return None;
                }
            }
            MixinParam::Pattern(pattern) => {
                let v = positional.get(next)?;
                if v.to_string() != *pattern && v.unquoted() != *pattern {
                    return None;
                }
                next += 1;
            }
            MixinParam::Rest { name } => {
                has_rest = true;
                let rest: Vec<Value> = positional
                    .get(next..)
                    .unwrap_or_default()
                    .iter()
                    .map(|v| (*v).clone())
                    .collect();
                next = positional.len();
                if let Some(name) = name {
                    frame.vars.insert(
                        name.clone(),
                        VarDef::Value(Value::List {
                            items: rest,
                            separator: Separator::Space,
                        }),
                    );
                }
            }
        }
    }

    if used_named != named || (!has_rest && next < positional.len()) {
        return None;
    }
    Some(frame)
}
