// src/exec/backend.rs

//! Where the runtime sends compile tasks.
//!
//! Tests implement [`ExecutorBackend`] to record what was started and answer
//! with `TaskCompleted` events of their choosing.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::tasks::ScheduledTask;

use super::ExecContext;
use super::executor_loop::spawn_executor;

/// Starts one compile task; completion is reported later as
/// `RuntimeEvent::TaskCompleted`.
///
/// The scheduler starts at most one task per run at a time, so an
/// implementation never has two compiles of the same run in flight.
pub trait ExecutorBackend: Send {
    fn start(&mut self, task: ScheduledTask)
    -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Hands tasks to the background compile loop.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    /// Spawns the compile loop; it reports to `runtime_tx`.
    pub fn new(ctx: ExecContext, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            tx: spawn_executor(ctx, runtime_tx),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn start(
        &mut self,
        task: ScheduledTask,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();
        Box::pin(async move {
            debug!(
                task = %task.name,
                run_id = task.run_id,
                jobs = task.jobs.len(),
                in_process = !task.spawn,
                "queueing compile"
            );
            tx.send(task).await.map_err(Error::from)?;
            Ok(())
        })
    }
}
