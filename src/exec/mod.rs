// src/exec/mod.rs

//! Task execution layer.
//!
//! Runs the compile tasks dispatched by the runtime, either in-process on
//! the blocking pool or as a child `stylewatch <task>` process, and reports
//! back with `RuntimeEvent::TaskCompleted`.
//!
//! - [`executor_loop`] owns the loop that runs one task at a time.
//! - [`task_runner`] runs a single task.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`; tests swap in a fake.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

use std::path::PathBuf;
use std::sync::Arc;

use crate::fs::FileSystem;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;

/// What the executor needs besides the task itself.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub fs: Arc<dyn FileSystem>,
    /// Config file handed to child processes for `spawn = true` tasks.
    pub config_path: PathBuf,
}
