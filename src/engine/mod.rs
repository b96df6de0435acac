// src/engine/mod.rs

//! Runs compile tasks in response to watch triggers.
//!
//! [`core::CoreRuntime`] is a pure state machine over [`RuntimeEvent`]s:
//! it starts a run of compile tasks, queues or replaces triggers that arrive
//! while a run is compiling, and decides when to stop.
//! [`runtime::Runtime`] feeds it from a channel, starts the compiles it asks
//! for and reports each finished run.

/// Canonical task name type used throughout the engine (`less:<target>`).
pub type TaskName = String;

/// Outcome of a compile task for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Exit code of a spawned task; 1 when an in-process compile failed or
    /// the task could not run at all.
    Failed(i32),
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Why tasks were triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// `at_begin` targets compile once before the first change.
    Startup,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once the scheduler is idle and nothing is queued.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, executor, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// These tasks should run (one watch batch).
    TasksTriggered {
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    },
    /// A compile task finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::{Runtime, WatchSummary};
