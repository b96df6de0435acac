// src/tasks/mod.rs

//! Task names and sequential run scheduling.
//!
//! - [`registry`] resolves command-line and alias task names.
//! - [`scheduler`] runs the compile tasks of one run, one after another.
//! - [`task_info`] holds task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod registry;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_info;

pub use registry::{TaskRef, TaskRegistry, register_default_task};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskInfo, TaskRunState};
