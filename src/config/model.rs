// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::compile::{CleanCssOptions, CompileJob, SpecialComments};
use crate::types::{TriggerWhileRunningBehaviour, WatchEventKind};

/// Configuration as read from `Stylewatch.toml`, before validation.
///
/// ```toml
/// [less.options]
/// paths = ["nouveau/css"]
/// optimization = 2
///
/// [less.options.clean_css]
/// advanced = true
/// keep_special_comments = 0
/// process_import = true
///
/// [less.dist.files]
/// "nouveau/css/main.css" = "nouveau/css/main.less"
///
/// [watch.styles]
/// files = ["nouveau/css/*.css", "nouveau/css/*.less"]
/// tasks = ["less:dist"]
/// options = { spawn = false, event = ["added", "deleted", "changed"] }
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub less: RawLessSection,

    #[serde(default)]
    pub watch: RawWatchSection,

    /// `[alias]`: task name -> list of task names.
    #[serde(default)]
    pub alias: BTreeMap<String, Vec<String>>,
}

/// `[config]` section: what happens to triggers that arrive mid-run.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// A single pattern or a list of patterns.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// `[less]`: shared `options` plus one table per target.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLessSection {
    #[serde(default)]
    pub options: RawLessOptions,

    #[serde(flatten)]
    pub targets: BTreeMap<String, RawLessTarget>,
}

/// Less options; every field is optional so targets can override
/// individual fields.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLessOptions {
    pub paths: Option<Vec<String>>,
    pub optimization: Option<i64>,
    pub clean_css: Option<RawCleanCss>,
}

/// `clean_css` plugin options.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCleanCss {
    pub enabled: Option<bool>,
    pub advanced: Option<bool>,
    pub keep_special_comments: Option<SpecialComments>,
    pub process_import: Option<bool>,
}

/// `[less.<target>]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLessTarget {
    /// Destination -> source pattern(s).
    #[serde(default)]
    pub files: BTreeMap<String, OneOrMany>,

    #[serde(default)]
    pub options: RawLessOptions,
}

/// `[watch]`: shared `options` plus one table per target.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawWatchSection {
    #[serde(default)]
    pub options: RawWatchOptions,

    #[serde(flatten)]
    pub targets: BTreeMap<String, RawWatchTarget>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawWatchOptions {
    pub spawn: Option<bool>,
    /// `"all"`, one event name, or a list of event names.
    pub event: Option<OneOrMany>,
    /// Milliseconds.
    pub debounce_delay: Option<u64>,
    pub at_begin: Option<bool>,
    pub use_hash: Option<bool>,
}

/// `[watch.<target>]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWatchTarget {
    #[serde(default)]
    pub files: OneOrMany,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub tasks: OneOrMany,

    #[serde(default)]
    pub options: RawWatchOptions,
}

/// Resolved options of one less target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessOptions {
    pub paths: Vec<String>,
    pub optimization: u8,
    pub clean_css: CleanCssOptions,
}

/// A validated `[less.<target>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessTarget {
    pub name: String,
    /// `(destination, source patterns)` in destination order.
    pub files: Vec<(String, Vec<String>)>,
    pub options: LessOptions,
}

/// Resolved options of one watch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Run triggered tasks in a child process instead of in-process.
    pub spawn: bool,
    pub events: Vec<WatchEventKind>,
    pub debounce_delay: Duration,
    /// Run the tasks once when the watcher starts.
    pub at_begin: bool,
    /// Only trigger when the content of a matched file actually changed.
    pub use_hash: bool,
}

/// A validated `[watch.<target>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub name: String,
    pub files: Vec<String>,
    pub exclude: Vec<String>,
    pub tasks: Vec<String>,
    pub options: WatchOptions,
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    root: PathBuf,
    config: ConfigSection,
    less: BTreeMap<String, LessTarget>,
    watch: BTreeMap<String, WatchTarget>,
    alias: BTreeMap<String, Vec<String>>,
}

impl ConfigFile {
    /// Internal constructor for validated configs.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        less: BTreeMap<String, LessTarget>,
        watch: BTreeMap<String, WatchTarget>,
        alias: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            root: PathBuf::from("."),
            config,
            less,
            watch,
            alias,
        }
    }

    /// Set the project root every configured path is relative to.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn less_targets(&self) -> &BTreeMap<String, LessTarget> {
        &self.less
    }

    pub fn watch_targets(&self) -> &BTreeMap<String, WatchTarget> {
        &self.watch
    }

    pub fn aliases(&self) -> &BTreeMap<String, Vec<String>> {
        &self.alias
    }

    /// One [`CompileJob`] per `files` entry of the named target.
    pub fn compile_jobs(&self, target: &str) -> Vec<CompileJob> {
        let Some(t) = self.less.get(target) else {
            return Vec::new();
        };
        t.files
            .iter()
            .map(|(dest, sources)| CompileJob {
                target: t.name.clone(),
                root: self.root.clone(),
                source_patterns: sources.clone(),
                destination: PathBuf::from(dest),
                include_paths: t.options.paths.iter().map(PathBuf::from).collect(),
                optimization: t.options.optimization,
                minifier: t.options.clean_css,
            })
            .collect()
    }

    /// Every compile destination, relative to the root.
    pub fn destinations(&self) -> Vec<String> {
        self.less
            .values()
            .flat_map(|t| t.files.iter().map(|(dest, _)| dest.clone()))
            .collect()
    }
}
