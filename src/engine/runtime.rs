// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::tasks::ScheduledTask;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, TaskName, TaskOutcome};

/// What a watch session did, returned when the runtime stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Runs that finished (successfully or not).
    pub runs: u64,
    /// Runs in which at least one compile task failed.
    pub failed_runs: u64,
}

/// Bookkeeping for the run currently compiling.
#[derive(Debug)]
struct ActiveRun {
    run_id: u64,
    started: Instant,
    compiled: Vec<TaskName>,
    failed: Vec<TaskName>,
}

impl ActiveRun {
    fn new(run_id: u64) -> Self {
        Self {
            run_id,
            started: Instant::now(),
            compiled: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Async shell around [`CoreRuntime`].
///
/// Feeds `RuntimeEvent`s to the core, starts the compiles it dispatches and
/// reports every finished run the way the watch task prints it.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    active: Option<ActiveRun>,
    summary: WatchSummary,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("active", &self.active)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            active: None,
            summary: WatchSummary::default(),
        }
    }

    /// Process events until shutdown, `exit_when_idle`, or until every
    /// sender is gone.
    pub async fn run(mut self) -> Result<WatchSummary> {
        debug!("runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            if let RuntimeEvent::TaskCompleted { task, outcome } = &event {
                self.record_completion(task, *outcome);
            }

            let step = self.core.step(event);
            let mut exit = !step.keep_running;
            for command in step.commands {
                match command {
                    CoreCommand::DispatchTasks(tasks) => {
                        for task in tasks {
                            self.start(task).await?;
                        }
                    }
                    CoreCommand::RequestExit => exit = true,
                }
            }

            if self.core.is_idle() {
                self.finish_run();
            }
            if exit {
                break;
            }
        }

        if let Some(run) = &self.active {
            warn!(run_id = run.run_id, "stopping with a compile still in progress");
        }
        info!(
            runs = self.summary.runs,
            failed_runs = self.summary.failed_runs,
            "watch stopped"
        );
        Ok(self.summary)
    }

    async fn start(&mut self, task: ScheduledTask) -> Result<()> {
        if self.active.as_ref().is_some_and(|run| run.run_id != task.run_id) {
            self.finish_run();
        }
        if self.active.is_none() {
            self.active = Some(ActiveRun::new(task.run_id));
        }

        let destinations: Vec<String> = task
            .jobs
            .iter()
            .map(|job| job.destination.display().to_string())
            .collect();
        info!(
            task = %task.name,
            run_id = task.run_id,
            ?destinations,
            "Running \"{}\" (less) task",
            task.name
        );

        self.executor.start(task).await
    }

    fn record_completion(&mut self, task: &str, outcome: TaskOutcome) {
        let Some(run) = self.active.as_mut() else {
            return;
        };
        if outcome.is_success() {
            run.compiled.push(task.to_string());
        } else {
            run.failed.push(task.to_string());
        }
    }

    fn finish_run(&mut self) {
        let Some(run) = self.active.take() else {
            return;
        };
        let secs = run.started.elapsed().as_secs_f64();
        self.summary.runs += 1;

        if run.failed.is_empty() {
            info!(
                run_id = run.run_id,
                compiled = ?run.compiled,
                "Completed in {secs:.3}s - Waiting..."
            );
        } else {
            self.summary.failed_runs += 1;
            warn!(
                run_id = run.run_id,
                compiled = ?run.compiled,
                failed = ?run.failed,
                "Completed with errors in {secs:.3}s - Waiting..."
            );
        }
    }
}
