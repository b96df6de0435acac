// src/exec/task_runner.rs

//! Runs a single compile task.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::compile::{self, CompileJob};
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::ExecContext;
use crate::fs::FileSystem;
use crate::tasks::ScheduledTask;

/// Run `task` to completion and report a `TaskCompleted` event.
///
/// Compile errors are logged here; the runtime only sees the outcome.
pub async fn run_task(
    task: ScheduledTask,
    ctx: &ExecContext,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    let name = task.name.clone();
    let run_id = task.run_id;

    debug!(task = %name, run_id, spawn = task.spawn, "running task");

    let outcome = if task.spawn {
        run_in_child(&task, ctx).await
    } else {
        run_in_process(task, Arc::clone(&ctx.fs)).await
    };

    let outcome = outcome.unwrap_or_else(|err| {
        error!(task = %name, run_id, error = %format!("{err:#}"), "task could not run");
        TaskOutcome::Failed(1)
    });

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: name.clone(),
            outcome,
        })
        .await
    {
        error!(task = %name, error = %err, "runtime gone; dropping TaskCompleted");
    }
}

/// Compile every job of the task on the blocking pool.
async fn run_in_process(task: ScheduledTask, fs: Arc<dyn FileSystem>) -> Result<TaskOutcome> {
    let name = task.name.clone();
    let outcome = tokio::task::spawn_blocking(move || compile_jobs(fs.as_ref(), &task.name, &task.jobs))
        .await
        .with_context(|| format!("compile task '{name}' panicked"))?;
    Ok(outcome)
}

/// Run `jobs` in order, stopping at the first failure.
pub fn compile_jobs(fs: &dyn FileSystem, task: &str, jobs: &[CompileJob]) -> TaskOutcome {
    for job in jobs {
        if let Err(err) = compile::compile(fs, job) {
            error!(
                task = %task,
                destination = %job.destination.display(),
                "{err}"
            );
            return TaskOutcome::Failed(1);
        }
    }
    TaskOutcome::Success
}

/// Re-invoke this executable as `stylewatch --config <path> <task>`.
async fn run_in_child(task: &ScheduledTask, ctx: &ExecContext) -> Result<TaskOutcome> {
    let exe = std::env::current_exe().context("locating the stylewatch executable")?;

    let status = Command::new(&exe)
        .arg("--config")
        .arg(&ctx.config_path)
        .arg(&task.name)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .status()
        .await
        .with_context(|| format!("spawning child process for task '{}'", task.name))?;

    // No code means the child was killed by a signal.
    let code = status.code().unwrap_or(1);
    info!(
        task = %task.name,
        run_id = task.run_id,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    })
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn stops_at_the_first_failing_job() {
        let fs = MockFileSystem::new();
        fs.add_file("b.less", ".b { color: blue; }");
        let jobs = vec![
            CompileJob::new("t", vec!["missing.less".to_string()], "a.css"),
            CompileJob::new("t", vec!["b.less".to_string()], "b.css"),
        ];

        assert_eq!(compile_jobs(&fs, "less:t", &jobs), TaskOutcome::Failed(1));
        assert!(fs.contents("b.css").is_none());
    }

    /// Panics on every read, so the blocking compile never returns.
    #[derive(Debug)]
    struct PanickingFs;

    impl FileSystem for PanickingFs {
        fn read_to_string(&self, _: &Path) -> Result<String> {
            panic!("read_to_string")
        }
        fn open_read(&self, _: &Path) -> Result<Box<dyn std::io::Read + Send>> {
            panic!("open_read")
        }
        fn write(&self, _: &Path, _: &[u8]) -> Result<()> {
            panic!("write")
        }
        fn is_file(&self, _: &Path) -> bool {
            true
        }
        fn is_dir(&self, _: &Path) -> bool {
            false
        }
        fn read_dir(&self, _: &Path) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn a_task_that_cannot_run_reports_exit_code_one() {
        let ctx = ExecContext {
            fs: Arc::new(PanickingFs),
            config_path: "Stylewatch.toml".into(),
        };
        let task = ScheduledTask {
            name: "less:a".to_string(),
            jobs: vec![CompileJob::new("a", vec!["a.less".to_string()], "a.css")],
            spawn: false,
            run_id: 1,
        };
        let (tx, mut rx) = mpsc::channel(4);

        run_task(task, &ctx, &tx).await;

        match rx.recv().await {
            Some(RuntimeEvent::TaskCompleted { outcome, .. }) => {
                assert_eq!(outcome, TaskOutcome::Failed(1));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_process_task_reports_completion() {
        let fs = MockFileSystem::new();
        fs.add_file("a.less", ".a { color: red; }");
        let ctx = ExecContext {
            fs: Arc::new(fs.clone()),
            config_path: "Stylewatch.toml".into(),
        };
        let task = ScheduledTask {
            name: "less:a".to_string(),
            jobs: vec![CompileJob::new("a", vec!["a.less".to_string()], "a.css")],
            spawn: false,
            run_id: 1,
        };
        let (tx, mut rx) = mpsc::channel(4);

        run_task(task, &ctx, &tx).await;

        match rx.recv().await {
            Some(RuntimeEvent::TaskCompleted { task, outcome }) => {
                assert_eq!(task, "less:a");
                assert_eq!(outcome, TaskOutcome::Success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(fs.contents("a.css").is_some());
    }
}
