// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::compile::{CleanCssOptions, SpecialComments};
use crate::config::model::{
    ConfigFile, LessOptions, LessTarget, RawCleanCss, RawConfigFile, RawLessOptions,
    RawWatchOptions, WatchOptions, WatchTarget,
};
use crate::errors::{Result, StylewatchError};
use crate::tasks::registry::{TaskRegistry, is_builtin, register_default_task};
use crate::types::WatchEventKind;

/// Default `debounce_delay` in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = StylewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let less = raw
            .less
            .targets
            .iter()
            .map(|(name, t)| {
                let options = resolve_less_options(name, &raw.less.options, &t.options)?;
                let files = t
                    .files
                    .iter()
                    .map(|(dest, src)| (dest.clone(), src.clone().into_vec()))
                    .collect();
                Ok((
                    name.clone(),
                    LessTarget {
                        name: name.clone(),
                        files,
                        options,
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let watch = raw
            .watch
            .targets
            .iter()
            .map(|(name, t)| {
                let options = resolve_watch_options(name, &raw.watch.options, &t.options)?;
                Ok((
                    name.clone(),
                    WatchTarget {
                        name: name.clone(),
                        files: t.files.clone().into_vec(),
                        exclude: t.exclude.clone(),
                        tasks: t.tasks.clone().into_vec(),
                        options,
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let mut alias = raw.alias;
        register_default_task(&mut alias);

        Ok(ConfigFile::new_unchecked(raw.config, less, watch, alias))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_less_targets(cfg)?;
    validate_global_config(cfg)?;
    validate_less_targets(cfg)?;
    validate_alias_graph(cfg)?;
    validate_task_references(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> StylewatchError {
    StylewatchError::ConfigError(msg.into())
}

fn ensure_has_less_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.less.targets.is_empty() {
        return Err(config_error(
            "config must contain at least one [less.<target>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(config_error("[config].queue_length must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_less_targets(cfg: &RawConfigFile) -> Result<()> {
    validate_optimization("less.options", cfg.less.options.optimization)?;

    for (name, target) in &cfg.less.targets {
        if name.contains(':') {
            return Err(config_error(format!(
                "less target name '{name}' must not contain ':'"
            )));
        }
        if target.files.is_empty() {
            return Err(config_error(format!(
                "[less.{name}] must map at least one destination in `files`"
            )));
        }
        for (dest, sources) in &target.files {
            let sources = sources.clone().into_vec();
            if sources.is_empty() || sources.iter().any(|s| s.trim().is_empty()) {
                return Err(config_error(format!(
                    "[less.{name}].files.\"{dest}\" must name at least one source"
                )));
            }
        }
        validate_optimization(&format!("less.{name}.options"), target.options.optimization)?;
    }
    Ok(())
}

fn validate_optimization(section: &str, level: Option<i64>) -> Result<()> {
    match level {
        Some(l) if !(0..=2).contains(&l) => Err(config_error(format!(
            "[{section}].optimization must be 0, 1 or 2 (got {l})"
        ))),
        _ => Ok(()),
    }
}

fn validate_alias_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: alias -> alias it expands to.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for (name, targets) in &cfg.alias {
        if is_builtin(name) {
            return Err(config_error(format!(
                "alias '{name}' would shadow a built-in task"
            )));
        }
        if targets.is_empty() {
            return Err(config_error(format!("alias '{name}' has no tasks")));
        }
        graph.add_node(name.as_str());
        for target in targets {
            if cfg.alias.contains_key(target) {
                graph.add_edge(name.as_str(), target.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(StylewatchError::AliasCycle(format!(
            "cycle detected in [alias] involving '{}'",
            cycle.node_id()
        ))),
    }
}

fn validate_task_references(cfg: &RawConfigFile) -> Result<()> {
    let registry = TaskRegistry::new(
        cfg.less.targets.keys().cloned(),
        cfg.watch.targets.keys().cloned(),
        cfg.alias.clone(),
    );

    for (name, targets) in &cfg.alias {
        for target in targets {
            registry.resolve(target).map_err(|e| {
                config_error(format!("alias '{name}' references an unknown task: {e}"))
            })?;
        }
    }

    for (name, target) in &cfg.watch.targets {
        let files = target.files.clone().into_vec();
        if files.is_empty() {
            return Err(config_error(format!(
                "[watch.{name}] must list at least one pattern in `files`"
            )));
        }
        let tasks = target.tasks.clone().into_vec();
        if tasks.is_empty() {
            return Err(config_error(format!(
                "[watch.{name}] must list at least one task in `tasks`"
            )));
        }
        for task in &tasks {
            let resolved = registry.resolve(task).map_err(|e| {
                config_error(format!("[watch.{name}] references an unknown task: {e}"))
            })?;
            if let Some(w) = resolved.iter().find(|t| t.is_watch()) {
                return Err(config_error(format!(
                    "[watch.{name}] cannot trigger watch task '{w}'"
                )));
            }
        }
    }
    Ok(())
}

fn resolve_less_options(
    target: &str,
    shared: &RawLessOptions,
    own: &RawLessOptions,
) -> Result<LessOptions> {
    let optimization = own.optimization.or(shared.optimization).unwrap_or(0);
    let optimization = u8::try_from(optimization).map_err(|_| {
        config_error(format!("[less.{target}] optimization out of range"))
    })?;

    Ok(LessOptions {
        paths: own
            .paths
            .clone()
            .or_else(|| shared.paths.clone())
            .unwrap_or_default(),
        optimization,
        clean_css: resolve_clean_css(shared.clean_css.as_ref(), own.clean_css.as_ref()),
    })
}

/// Target fields win over shared ones; no `clean_css` table at all
/// disables the minifier.
fn resolve_clean_css(shared: Option<&RawCleanCss>, own: Option<&RawCleanCss>) -> CleanCssOptions {
    if shared.is_none() && own.is_none() {
        return CleanCssOptions::disabled();
    }
    let pick = |f: fn(&RawCleanCss) -> Option<bool>, default: bool| {
        own.and_then(f).or_else(|| shared.and_then(f)).unwrap_or(default)
    };
    let keep_special_comments = own
        .and_then(|c| c.keep_special_comments)
        .or_else(|| shared.and_then(|c| c.keep_special_comments))
        .unwrap_or(SpecialComments::All);

    CleanCssOptions {
        enabled: pick(|c| c.enabled, true),
        advanced: pick(|c| c.advanced, true),
        keep_special_comments,
        process_import: pick(|c| c.process_import, true),
    }
}

fn resolve_watch_options(
    target: &str,
    shared: &RawWatchOptions,
    own: &RawWatchOptions,
) -> Result<WatchOptions> {
    let events = match own.event.clone().or_else(|| shared.event.clone()) {
        None => WatchEventKind::ALL.to_vec(),
        Some(list) => parse_events(target, list.into_vec())?,
    };

    Ok(WatchOptions {
        spawn: own.spawn.or(shared.spawn).unwrap_or(true),
        events,
        debounce_delay: Duration::from_millis(
            own.debounce_delay
                .or(shared.debounce_delay)
                .unwrap_or(DEFAULT_DEBOUNCE_MS),
        ),
        at_begin: own.at_begin.or(shared.at_begin).unwrap_or(false),
        use_hash: own.use_hash.or(shared.use_hash).unwrap_or(false),
    })
}

fn parse_events(target: &str, names: Vec<String>) -> Result<Vec<WatchEventKind>> {
    if names.is_empty() {
        return Err(config_error(format!(
            "[watch.{target}].options.event must not be empty"
        )));
    }
    let mut events = Vec::new();
    for name in names {
        if name.trim().eq_ignore_ascii_case("all") {
            return Ok(WatchEventKind::ALL.to_vec());
        }
        let kind: WatchEventKind = name
            .parse()
            .map_err(|e: String| config_error(format!("[watch.{target}] {e}")))?;
        if !events.contains(&kind) {
            events.push(kind);
        }
    }
    events.sort();
    Ok(events)
}
