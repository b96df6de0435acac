// src/exec/executor_loop.rs

//! Background loop that runs dispatched compile tasks.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::exec::ExecContext;
use crate::exec::task_runner::run_task;
use crate::tasks::ScheduledTask;

/// Spawn the background executor loop.
///
/// Tasks are run strictly one at a time, in the order they arrive; the
/// scheduler never dispatches a second task before the first completed,
/// so compiles never overlap.
pub fn spawn_executor(
    ctx: ExecContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(task) = rx.recv().await {
            debug!(task = %task.name, run_id = task.run_id, "executor received task");
            run_task(task, &ctx, &runtime_tx).await;
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
