// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::model::{ConfigFile, WatchTarget};
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::tasks::registry::{TaskRef, TaskRegistry};
use crate::types::WatchEventKind;
use crate::watch::path_utils::relative_str;

/// Compiled globs and options of one `[watch.<target>]`.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths such as `"nouveau/css/main.less"` into [`WatchProfile::matches`].
#[derive(Clone)]
pub struct WatchProfile {
    name: String,
    /// Compile tasks (`less:<target>`) to run on a match.
    tasks: Vec<TaskName>,
    events: Vec<WatchEventKind>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    debounce_delay: Duration,
    at_begin: bool,
    use_hash: bool,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    /// Build a profile from explicit parts; `tasks` must already be
    /// resolved compile task names.
    pub fn new(
        name: impl Into<String>,
        files: &[String],
        exclude: &[String],
        tasks: Vec<TaskName>,
        events: Vec<WatchEventKind>,
    ) -> Result<Self> {
        let name = name.into();
        let watch_set = build_globset(files)
            .with_context(|| format!("building watch globset for watch:{name}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for watch:{name}"))?,
            )
        };
        Ok(Self {
            name,
            tasks,
            events,
            watch_set,
            exclude_set,
            debounce_delay: Duration::from_millis(crate::config::validate::DEFAULT_DEBOUNCE_MS),
            at_begin: false,
            use_hash: false,
        })
    }

    #[must_use]
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    #[must_use]
    pub fn with_use_hash(mut self, use_hash: bool) -> Self {
        self.use_hash = use_hash;
        self
    }

    #[must_use]
    pub fn with_at_begin(mut self, at_begin: bool) -> Self {
        self.at_begin = at_begin;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn events(&self) -> &[WatchEventKind] {
        &self.events
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debounce_delay
    }

    pub fn at_begin(&self) -> bool {
        self.at_begin
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// True if `rel_path` is matched by `files` and not by `exclude`.
    pub fn matches_path(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// True if an event of `kind` on `rel_path` should trigger this target.
    pub fn matches(&self, rel_path: &str, kind: WatchEventKind) -> bool {
        self.events.contains(&kind) && self.matches_path(rel_path)
    }
}

/// Build a GlobSet; `*` does not cross `/`.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn profile_from_target(target: &WatchTarget, registry: &TaskRegistry) -> Result<WatchProfile> {
    let mut tasks: Vec<TaskName> = Vec::new();
    for name in &target.tasks {
        for task in registry.resolve(name)? {
            if let TaskRef::Compile(_) = task {
                let task = task.name();
                if !tasks.contains(&task) {
                    tasks.push(task);
                }
            }
        }
    }

    Ok(WatchProfile::new(
        target.name.clone(),
        &target.files,
        &target.exclude,
        tasks,
        target.options.events.clone(),
    )?
    .with_debounce(target.options.debounce_delay)
    .with_at_begin(target.options.at_begin)
    .with_use_hash(target.options.use_hash))
}

/// Build profiles for the selected watch targets (all when `only` is empty).
pub fn build_profiles_from_config(cfg: &ConfigFile, only: &[String]) -> Result<Vec<WatchProfile>> {
    let registry = TaskRegistry::from_config(cfg);
    cfg.watch_targets()
        .values()
        .filter(|t| only.is_empty() || only.contains(&t.name))
        .map(|t| profile_from_target(t, &registry))
        .collect()
}

/// Collect every file under `root` matched by the profile's `files` and
/// `exclude` patterns, sorted.
///
/// Used for content hashing of `use_hash` targets.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    profile: &WatchProfile,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Some(rel) = relative_str(root, &path) {
                    if profile.matches_path(&rel) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
