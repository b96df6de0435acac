// src/tasks/task_info.rs

//! Compile task metadata and per-run state.

use crate::compile::CompileJob;
use crate::engine::TaskName;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Part of the run, waiting for its turn.
    Pending,
    /// Dispatched to the executor.
    Running,
    DoneSuccess,
    DoneFailed,
    /// Not run because an earlier task of the same run failed.
    Skipped,
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not participating in the current run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Skipped,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
            Some(RunState::Skipped) => TaskRunState::Skipped,
        }
    }
}

/// Static task information derived from config, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    /// `less:<target>`.
    pub name: TaskName,
    pub jobs: Vec<CompileJob>,
    /// Run in a child process instead of in-process.
    pub spawn: bool,

    pub run_state: Option<RunState>,
    pub last_successful_run: Option<u64>,
    pub last_failed_run: Option<u64>,
}

impl TaskInfo {
    pub fn new(name: impl Into<TaskName>, jobs: Vec<CompileJob>, spawn: bool) -> Self {
        Self {
            name: name.into(),
            jobs,
            spawn,
            run_state: None,
            last_successful_run: None,
            last_failed_run: None,
        }
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub jobs: Vec<CompileJob>,
    pub spawn: bool,
    /// Monotonically increasing run identifier shared by all tasks of a run.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            jobs: info.jobs.clone(),
            spawn: info.spawn,
            run_id,
        }
    }
}
