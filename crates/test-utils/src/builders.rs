// crates/test-utils/src/builders.rs

#![allow(dead_code)]

use std::collections::BTreeMap;

use stylewatch::compile::CompileJob;
use stylewatch::config::model::{
    OneOrMany, RawCleanCss, RawConfigFile, RawLessOptions, RawLessTarget, RawWatchOptions,
    RawWatchTarget,
};
use stylewatch::config::ConfigFile;
use stylewatch::errors::Result;
use stylewatch::tasks::ScheduledTask;
use stylewatch::types::TriggerWhileRunningBehaviour;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Add `dest <- src` to `[less.<target>]`, creating the target if needed.
    pub fn less(mut self, target: &str, dest: &str, src: &str) -> Self {
        let entry = self
            .config
            .less
            .targets
            .entry(target.to_string())
            .or_insert_with(|| RawLessTarget {
                files: BTreeMap::new(),
                options: RawLessOptions::default(),
            });
        entry
            .files
            .insert(dest.to_string(), OneOrMany::One(src.to_string()));
        self
    }

    pub fn include_path(mut self, path: &str) -> Self {
        self.config
            .less
            .options
            .paths
            .get_or_insert_with(Vec::new)
            .push(path.to_string());
        self
    }

    pub fn optimization(mut self, level: i64) -> Self {
        self.config.less.options.optimization = Some(level);
        self
    }

    /// Enable the minifier with the given `advanced` / `process_import`.
    pub fn clean_css(mut self, advanced: bool, process_import: bool) -> Self {
        self.config.less.options.clean_css = Some(RawCleanCss {
            enabled: Some(true),
            advanced: Some(advanced),
            keep_special_comments: None,
            process_import: Some(process_import),
        });
        self
    }

    pub fn watch(mut self, target: &str, files: &[&str], tasks: &[&str]) -> Self {
        self.config.watch.targets.insert(
            target.to_string(),
            RawWatchTarget {
                files: OneOrMany::Many(files.iter().map(|s| s.to_string()).collect()),
                exclude: Vec::new(),
                tasks: OneOrMany::Many(tasks.iter().map(|s| s.to_string()).collect()),
                options: RawWatchOptions::default(),
            },
        );
        self
    }

    /// Shared `[watch.options].spawn`.
    pub fn watch_spawn(mut self, spawn: bool) -> Self {
        self.config.watch.options.spawn = Some(spawn);
        self
    }

    pub fn watch_events(mut self, events: &[&str]) -> Self {
        self.config.watch.options.event =
            Some(OneOrMany::Many(events.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn alias(mut self, name: &str, tasks: &[&str]) -> Self {
        self.config.alias.insert(
            name.to_string(),
            tasks.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A `ScheduledTask` compiling `src` into `dest` in-process.
pub fn scheduled_task(name: &str, src: &str, dest: &str, run_id: u64) -> ScheduledTask {
    let target = name.strip_prefix("less:").unwrap_or(name);
    ScheduledTask {
        name: name.to_string(),
        jobs: vec![CompileJob::new(target, vec![src.to_string()], dest)],
        spawn: false,
        run_id,
    }
}
