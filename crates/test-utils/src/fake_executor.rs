// crates/test-utils/src/fake_executor.rs

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use stylewatch::engine::{RuntimeEvent, TaskOutcome};
use stylewatch::errors::Result;
use stylewatch::exec::ExecutorBackend;
use stylewatch::tasks::ScheduledTask;

/// Records every started task with its run id and completes it at once,
/// with `Success` unless [`FakeExecutor::with_outcome`] says otherwise.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<(String, u64)>>>,
    outcomes: HashMap<String, TaskOutcome>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<(String, u64)>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            outcomes: HashMap::new(),
        }
    }

    pub fn with_outcome(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn start(
        &mut self,
        task: ScheduledTask,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        self.executed
            .lock()
            .unwrap()
            .push((task.name.clone(), task.run_id));
        let outcome = self
            .outcomes
            .get(&task.name)
            .copied()
            .unwrap_or(TaskOutcome::Success);

        Box::pin(async move {
            tx.send(RuntimeEvent::TaskCompleted {
                task: task.name,
                outcome,
            })
            .await
            .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }
}
