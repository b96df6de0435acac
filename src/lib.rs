// src/lib.rs

pub mod cli;
pub mod compile;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod less;
pub mod logging;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::{ExecContext, RealExecutorBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::tasks::{Scheduler, TaskRef, TaskRegistry};

/// High-level entry point used by `main.rs`.
///
/// Compile tasks on the command line run in order, synchronously. The first
/// watch task starts the file watcher (together with every other watch task
/// given) and blocks until Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let registry = TaskRegistry::from_config(&cfg);
    let plan = registry.resolve_all(&args.tasks)?;

    if args.dry_run {
        print_dry_run(&cfg, &plan);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let mut watch_targets = Vec::new();
    for task in &plan {
        match task {
            TaskRef::Compile(target) if watch_targets.is_empty() => {
                run_compile_task(fs.as_ref(), &cfg, target)?;
            }
            TaskRef::Compile(_) => {
                warn!(task = %task, "listed after a watch task; it will not run");
            }
            TaskRef::Watch(target) => watch_targets.push(target.clone()),
        }
    }

    if watch_targets.is_empty() {
        return Ok(());
    }
    run_watch(cfg, &config_path, &watch_targets, fs).await
}

/// Run every compile job of `less:<target>`, failing on the first error.
pub fn run_compile_task(fs: &dyn FileSystem, cfg: &ConfigFile, target: &str) -> Result<()> {
    info!("Running \"less:{target}\" (less) task");
    for job in cfg.compile_jobs(target) {
        compile::compile(fs, &job)?;
    }
    Ok(())
}

/// Watch the selected targets until Ctrl-C.
async fn run_watch(
    cfg: ConfigFile,
    config_path: &Path,
    targets: &[String],
    fs: Arc<dyn FileSystem>,
) -> Result<()> {
    info!(?targets, "Running \"watch\" task");

    let scheduler = Scheduler::from_config(&cfg);
    let section = cfg.config_section();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let ctx = ExecContext {
        fs: Arc::clone(&fs),
        config_path: config_path.to_path_buf(),
    };
    let executor = RealExecutorBackend::new(ctx, rt_tx.clone());

    let profiles = watch::build_profiles_from_config(&cfg, targets)?;
    let startup: Vec<String> = {
        let mut tasks: Vec<String> = Vec::new();
        for profile in profiles.iter().filter(|p| p.at_begin()) {
            for task in profile.tasks() {
                if !tasks.contains(task) {
                    tasks.push(task.clone());
                }
            }
        }
        tasks
    };

    let _watcher_handle = watch::spawn_watcher(
        cfg.root(),
        profiles,
        &cfg.destinations(),
        rt_tx.clone(),
        fs,
    )?;

    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    if !startup.is_empty() {
        info!(tasks = ?startup, "at_begin: compiling before the first change");
        rt_tx
            .send(RuntimeEvent::TasksTriggered {
                tasks: startup,
                reason: TriggerReason::Startup,
            })
            .await?;
    }

    let core = CoreRuntime::new(
        scheduler,
        section.triggered_while_running_behaviour,
        section.queue_length,
        RuntimeOptions::default(),
    );
    let summary = Runtime::new(core, rt_rx, executor).run().await?;
    debug!(?summary, "watch finished");
    Ok(())
}

/// Print the resolved plan without compiling or watching.
fn print_dry_run(cfg: &ConfigFile, plan: &[TaskRef]) {
    println!("stylewatch dry-run");
    println!("  root = {}", cfg.root().display());
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config_section().triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config_section().queue_length);
    println!();

    println!("plan ({}):", plan.len());
    for task in plan {
        println!("  - {task}");
        match task {
            TaskRef::Compile(target) => {
                for job in cfg.compile_jobs(target) {
                    println!(
                        "      {} <- {:?}",
                        job.destination.display(),
                        job.source_patterns
                    );
                    if !job.include_paths.is_empty() {
                        println!("      paths: {:?}", job.include_paths);
                    }
                    println!("      optimization: {}", job.optimization);
                    if job.minifier.enabled {
                        println!("      clean_css: {:?}", job.minifier);
                    }
                }
            }
            TaskRef::Watch(target) => {
                if let Some(w) = cfg.watch_targets().get(target) {
                    println!("      files: {:?}", w.files);
                    if !w.exclude.is_empty() {
                        println!("      exclude: {:?}", w.exclude);
                    }
                    println!("      tasks: {:?}", w.tasks);
                    println!(
                        "      spawn: {}, events: {:?}, debounce: {:?}",
                        w.options.spawn, w.options.events, w.options.debounce_delay
                    );
                }
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
