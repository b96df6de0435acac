// src/tasks/registry.rs

//! Task names and how they resolve.
//!
//! - `less` runs every less target, `less:<target>` one of them.
//! - `watch` watches every watch target, `watch:<target>` one of them.
//! - `[alias]` names expand to other task names, recursively.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::errors::{Result, StylewatchError};

/// Name of the task run when none is given on the command line.
pub const DEFAULT_TASK: &str = "default";

pub const LESS: &str = "less";
pub const WATCH: &str = "watch";

/// A concrete task: one target of one task kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskRef {
    Compile(String),
    Watch(String),
}

impl TaskRef {
    /// Parse a fully qualified `less:<target>` / `watch:<target>` name.
    pub fn parse(name: &str) -> Option<TaskRef> {
        let (kind, target) = name.split_once(':')?;
        if target.is_empty() {
            return None;
        }
        match kind {
            LESS => Some(TaskRef::Compile(target.to_string())),
            WATCH => Some(TaskRef::Watch(target.to_string())),
            _ => None,
        }
    }

    pub fn name(&self) -> TaskName {
        self.to_string()
    }

    pub fn is_watch(&self) -> bool {
        matches!(self, TaskRef::Watch(_))
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Compile(t) => write!(f, "{LESS}:{t}"),
            TaskRef::Watch(t) => write!(f, "{WATCH}:{t}"),
        }
    }
}

/// Install the `default` alias (`["watch"]`) unless one is configured.
pub fn register_default_task(aliases: &mut BTreeMap<String, Vec<String>>) {
    aliases
        .entry(DEFAULT_TASK.to_string())
        .or_insert_with(|| vec![WATCH.to_string()]);
}

/// True if `name` is reserved for the built-in task kinds.
pub fn is_builtin(name: &str) -> bool {
    name == LESS
        || name == WATCH
        || name.starts_with("less:")
        || name.starts_with("watch:")
}

/// Every task name the configuration makes available.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    less: BTreeSet<String>,
    watch: BTreeSet<String>,
    aliases: BTreeMap<String, Vec<String>>,
}

impl TaskRegistry {
    pub fn new<L, W>(less: L, watch: W, aliases: BTreeMap<String, Vec<String>>) -> Self
    where
        L: IntoIterator<Item = String>,
        W: IntoIterator<Item = String>,
    {
        Self {
            less: less.into_iter().collect(),
            watch: watch.into_iter().collect(),
            aliases,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(
            cfg.less_targets().keys().cloned(),
            cfg.watch_targets().keys().cloned(),
            cfg.aliases().clone(),
        )
    }

    /// Resolve one task name into concrete tasks, in order.
    pub fn resolve(&self, name: &str) -> Result<Vec<TaskRef>> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        self.resolve_into(name, &mut stack, &mut out)?;
        Ok(out)
    }

    /// Resolve a command-line task list; an empty list means `default`.
    pub fn resolve_all(&self, names: &[String]) -> Result<Vec<TaskRef>> {
        let default = [DEFAULT_TASK.to_string()];
        let names = if names.is_empty() { &default[..] } else { names };

        let mut out = Vec::new();
        for name in names {
            for task in self.resolve(name)? {
                if !out.contains(&task) {
                    out.push(task);
                }
            }
        }
        debug!(?names, resolved = out.len(), "resolved task list");
        Ok(out)
    }

    fn resolve_into(&self, name: &str, stack: &mut Vec<String>, out: &mut Vec<TaskRef>) -> Result<()> {
        let name = name.trim();

        if name == LESS {
            if self.less.is_empty() {
                return Err(StylewatchError::TaskNotFound(format!(
                    "{name} (no [less.<target>] configured)"
                )));
            }
            out.extend(self.less.iter().map(|t| TaskRef::Compile(t.clone())));
            return Ok(());
        }

        if name == WATCH {
            if self.watch.is_empty() {
                return Err(StylewatchError::TaskNotFound(format!(
                    "{name} (no [watch.<target>] configured)"
                )));
            }
            out.extend(self.watch.iter().map(|t| TaskRef::Watch(t.clone())));
            return Ok(());
        }

        if let Some(task) = TaskRef::parse(name) {
            let known = match &task {
                TaskRef::Compile(t) => self.less.contains(t),
                TaskRef::Watch(t) => self.watch.contains(t),
            };
            if !known {
                return Err(StylewatchError::TaskNotFound(name.to_string()));
            }
            out.push(task);
            return Ok(());
        }

        let Some(targets) = self.aliases.get(name) else {
            return Err(StylewatchError::TaskNotFound(name.to_string()));
        };

        if stack.iter().any(|s| s == name) {
            stack.push(name.to_string());
            return Err(StylewatchError::AliasCycle(stack.join(" -> ")));
        }

        stack.push(name.to_string());
        for target in targets {
            self.resolve_into(target, stack, out)?;
        }
        stack.pop();
        Ok(())
    }
}
