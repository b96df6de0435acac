// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! Consumes [`RuntimeEvent`]s and produces an updated state plus a list of
//! commands for the IO shell (`engine::runtime::Runtime`), which owns the
//! channels, the executor and Ctrl-C handling.
//!
//! The core has no Tokio types and performs no IO, so it is unit tested
//! directly.

use crate::engine::event_handlers::{handle_task_completion, handle_tasks_triggered, CoreStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::tasks::Scheduler;
use crate::types::TriggerWhileRunningBehaviour;

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
        }
    }

    /// Whether no run is active (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Handle a single runtime event, returning the commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TasksTriggered { tasks, reason } => {
                handle_tasks_triggered(&mut self.scheduler, &mut self.queue, tasks, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
