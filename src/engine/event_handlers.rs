// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};
use crate::tasks::{ScheduledTask, Scheduler, TaskRunState};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Request that the process exits (idle with `exit_when_idle`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle one batch of triggered tasks.
///
/// - Idle: start a new run from this batch plus anything already queued.
/// - Running: a task not yet in the run joins it; a task that is pending
///   will pick up the change anyway; a task that is running or done is
///   recorded in the queue for the next run.
pub fn handle_tasks_triggered(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    tasks: Vec<TaskName>,
    reason: TriggerReason,
) -> CoreStep {
    debug!(?tasks, ?reason, "tasks triggered");

    if scheduler.is_idle() {
        let mut triggers: Vec<TaskName> = queue.drain_pending();
        for task in tasks {
            if !triggers.contains(&task) {
                triggers.push(task);
            }
        }
        return start_new_run_from_triggers(scheduler, triggers);
    }

    let mut commands = Vec::new();
    let mut queued = false;
    for task in tasks {
        match scheduler.run_state_of(&task) {
            None => {
                warn!(task = %task, "trigger for unknown task; ignoring");
            }
            Some(TaskRunState::NotInRun) => {
                let ready = scheduler.handle_trigger(&task);
                if !ready.is_empty() {
                    commands.push(CoreCommand::DispatchTasks(ready));
                }
            }
            Some(TaskRunState::Pending) => {
                debug!(task = %task, "task already pending in this run");
            }
            Some(_) => {
                queue.record_trigger(&task);
                queued = true;
            }
        }
    }
    if queued {
        queue.seal_batch();
    }

    CoreStep::running(commands)
}

/// Handle completion of the running task.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let ready = scheduler.handle_completion(&task, outcome);
    if !ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(ready));
    }

    commands.extend(maybe_start_queued_run(scheduler, queue));

    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

/// Seed a new run from a list of triggers, in order.
pub fn start_new_run_from_triggers(scheduler: &mut Scheduler, triggers: Vec<TaskName>) -> CoreStep {
    let mut seen = BTreeSet::new();
    let triggers: Vec<TaskName> = triggers
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if triggers.is_empty() {
        return CoreStep::running(Vec::new());
    }

    scheduler.start_new_run();

    let mut all_ready = Vec::new();
    for task in triggers {
        all_ready.extend(scheduler.handle_trigger(&task));
    }

    let mut commands = Vec::new();
    if !all_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(all_ready));
    }
    CoreStep::running(commands)
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let triggers = queue.drain_pending();
    if triggers.is_empty() {
        return Vec::new();
    }

    start_new_run_from_triggers(scheduler, triggers).commands
}
