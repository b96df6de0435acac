// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrive while a compile run is executing.
///
/// - Each queued entry is a *batch* of task names for one future run.
/// - `queue_length` (max_runs) bounds the number of batches kept; overflow
///   is folded into the newest kept batch, never dropped.
/// - When the runtime goes idle it calls `drain_pending()`, which merges all
///   batches into the task list of a single new run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Number of queued batches.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Record that `task` was triggered while a run is in progress.
    ///
    /// - `Queue`: merge into the last batch (creating one if needed), then
    ///   fold batches beyond `max_runs` together.
    /// - `Cancel`: forget every queued batch and keep only this task.
    pub fn record_trigger(&mut self, task: &str) {
        let name = task.to_string();

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if let Some(last_batch) = self.runs.back_mut() {
                    let inserted = last_batch.insert(name.clone());
                    debug!(
                        task = %name,
                        inserted,
                        "merged trigger into last queued batch (queue mode)",
                    );
                } else {
                    self.runs.push_back(BTreeSet::from([name.clone()]));
                    debug!(task = %name, "created first queued batch (queue mode)");
                }

                if self.runs.len() > self.max_runs {
                    debug!(
                        current_batches = self.runs.len(),
                        max_runs = self.max_runs,
                        "exceeded queue_length; folding newest batch into the previous one"
                    );
                    while self.runs.len() > self.max_runs {
                        let Some(newest) = self.runs.pop_back() else {
                            break;
                        };
                        match self.runs.back_mut() {
                            Some(prev) => prev.extend(newest),
                            None => self.runs.push_back(newest),
                        }
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(task = %name, "resetting queued batches to this task only (cancel mode)");
                self.runs.clear();
                self.runs.push_back(BTreeSet::from([name]));
            }
        }
    }

    /// Start a fresh batch so the next trigger does not merge into the
    /// previous one.
    pub fn seal_batch(&mut self) {
        if self.runs.back().is_some_and(|b| !b.is_empty()) {
            self.runs.push_back(BTreeSet::new());
        }
    }

    /// Drain every queued batch into one de-duplicated, sorted task list.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let mut merged: BTreeSet<TaskName> = BTreeSet::new();
        while let Some(batch) = self.runs.pop_front() {
            merged.extend(batch);
        }
        let tasks: Vec<TaskName> = merged.into_iter().collect();
        if !tasks.is_empty() {
            debug!(drained = tasks.len(), "drained queued triggers into new run");
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_coalesces_into_one_batch() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        q.record_trigger("less:b");
        q.record_trigger("less:a");
        q.record_trigger("less:b");
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain_pending(), vec!["less:a", "less:b"]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_mode_keeps_only_the_latest_trigger() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 3);
        q.record_trigger("less:a");
        q.record_trigger("less:b");
        assert_eq!(q.drain_pending(), vec!["less:b"]);
    }

    #[test]
    fn sealed_batches_are_bounded_by_queue_length() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
        q.record_trigger("less:a");
        q.seal_batch();
        q.record_trigger("less:b");
        q.seal_batch();
        q.record_trigger("less:c");
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain_pending(), vec!["less:a", "less:b", "less:c"]);
    }

    #[test]
    fn zero_length_is_clamped() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        q.record_trigger("less:a");
        assert_eq!(q.len(), 1);
    }
}
