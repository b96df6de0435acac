// src/tasks/scheduler_step.rs

use crate::engine::TaskName;
use crate::tasks::task_info::ScheduledTask;

/// Structured result of a single scheduler "step".
///
/// Tests use it to step a run manually and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Task dispatched as a result of this step (at most one).
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks that failed in this step, followed by the tasks skipped because
    /// of it.
    pub newly_failed: Vec<TaskName>,
    /// Whether this step finished the current run.
    pub run_just_finished: bool,
}
