// src/tasks/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::engine::{TaskName, TaskOutcome};
use crate::tasks::registry::{TaskRef, TaskRegistry};
use crate::tasks::scheduler_step::SchedulerStep;
use crate::tasks::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};

/// Sequential run scheduler.
///
/// A run is an ordered, de-duplicated list of compile tasks executed one
/// after another. At most one task is `Running` at any time. A failed task
/// skips the rest of its run.
#[derive(Debug)]
pub struct Scheduler {
    tasks: HashMap<TaskName, TaskInfo>,
    /// Tasks of the current run, in execution order.
    order: Vec<TaskName>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn new(tasks: impl IntoIterator<Item = TaskInfo>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.name.clone(), t)).collect(),
            order: Vec::new(),
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// One task per `[less.<target>]`.
    ///
    /// A task runs in a child process when a watch target that triggers it
    /// sets `spawn = true`.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let registry = TaskRegistry::from_config(cfg);

        let mut spawned: HashMap<TaskName, bool> = HashMap::new();
        for target in cfg.watch_targets().values() {
            for name in &target.tasks {
                let Ok(resolved) = registry.resolve(name) else {
                    continue;
                };
                for task in resolved {
                    let entry = spawned.entry(task.name()).or_insert(false);
                    *entry |= target.options.spawn;
                }
            }
        }

        let tasks = cfg.less_targets().keys().map(|target| {
            let name = TaskRef::Compile(target.clone()).name();
            let spawn = spawned.get(&name).copied().unwrap_or(false);
            TaskInfo::new(name, cfg.compile_jobs(target), spawn)
        });
        Self::new(tasks)
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state; `None` for unknown tasks.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of the tasks in the active run, in execution order.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }
        self.order.clone()
    }

    /// Start a new run, resetting per-run state.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.order.clear();

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Add `task` to the current run (production API).
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger_step_internal(task).newly_scheduled
    }

    /// Record the outcome of the running task (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_trigger`.
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        self.trigger_step_internal(task)
    }

    /// Manual-step variant of `handle_completion`.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    fn trigger_step_internal(&mut self, task: &str) -> SchedulerStep {
        if self.current_run_id.is_none() {
            warn!(
                task = %task,
                "handle_trigger called with no active run; implicitly starting a new run"
            );
            self.start_new_run();
        }

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state.is_none() => {
                info.run_state = Some(RunState::Pending);
                self.order.push(info.name.clone());
                debug!(task = %task, run_id = self.current_run_id, "task added to run");
            }
            Some(info) => {
                debug!(task = %task, state = ?info.run_state, "task already part of this run");
            }
            None => {
                warn!(task = %task, "trigger for unknown task; ignoring");
            }
        }

        let newly_scheduled = self.dispatch_next();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "handle_completion called with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut newly_failed = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) if info.run_state == Some(RunState::Running) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %task, run_id, "task completed successfully");
                }
                TaskOutcome::Failed(code) => {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    warn!(
                        task = %task,
                        run_id,
                        exit_code = code,
                        "task failed; skipping the rest of this run"
                    );
                    newly_failed.push(task.to_string());
                    newly_failed.extend(self.skip_pending());
                }
            },
            Some(info) => {
                warn!(task = %task, state = ?info.run_state, "completion for a task that is not running; ignoring");
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        let newly_scheduled = self.dispatch_next();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }

    /// Mark every pending task of the run as skipped.
    fn skip_pending(&mut self) -> Vec<TaskName> {
        let mut skipped = Vec::new();
        for name in &self.order {
            if let Some(info) = self.tasks.get_mut(name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::Skipped);
                    skipped.push(name.clone());
                }
            }
        }
        skipped
    }

    /// Dispatch the first pending task unless one is already running.
    fn dispatch_next(&mut self) -> Vec<ScheduledTask> {
        let Some(run_id) = self.current_run_id else {
            return Vec::new();
        };

        let running = self
            .order
            .iter()
            .any(|n| self.tasks.get(n).and_then(|i| i.run_state) == Some(RunState::Running));
        if running {
            return Vec::new();
        }

        for name in &self.order {
            if let Some(info) = self.tasks.get_mut(name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::Running);
                    debug!(task = %name, run_id, "dispatching task");
                    return vec![ScheduledTask::from_task_info(info, run_id)];
                }
            }
        }
        Vec::new()
    }

    /// Clear `current_run_id` once no task is pending or running.
    ///
    /// Returns `true` if this call transitioned the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let active = self.order.iter().any(|n| {
            matches!(
                self.tasks.get(n).and_then(|i| i.run_state),
                Some(RunState::Pending | RunState::Running)
            )
        });
        if active {
            return false;
        }

        info!(
            run_id = self.current_run_id,
            tasks = self.order.len(),
            "scheduler: run finished"
        );
        self.current_run_id = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(names: &[&str]) -> Scheduler {
        Scheduler::new(names.iter().map(|n| TaskInfo::new(*n, Vec::new(), false)))
    }

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn tasks_run_one_after_another() {
        let mut s = scheduler(&["less:a", "less:b"]);
        s.start_new_run();

        let first = s.handle_trigger("less:a");
        assert_eq!(names(&first), vec!["less:a"]);
        assert!(s.handle_trigger("less:b").is_empty());
        assert_eq!(s.run_state_of("less:b"), Some(TaskRunState::Pending));

        let next = s.handle_completion("less:a", TaskOutcome::Success);
        assert_eq!(names(&next), vec!["less:b"]);

        let step = s.step_completion("less:b", TaskOutcome::Success);
        assert!(step.run_just_finished);
        assert!(s.is_idle());
    }

    #[test]
    fn failure_skips_the_rest_of_the_run() {
        let mut s = scheduler(&["less:a", "less:b", "less:c"]);
        s.start_new_run();
        s.handle_trigger("less:a");
        s.handle_trigger("less:b");
        s.handle_trigger("less:c");

        let step = s.step_completion("less:a", TaskOutcome::Failed(1));

        assert!(step.newly_scheduled.is_empty());
        assert_eq!(step.newly_failed, vec!["less:a", "less:b", "less:c"]);
        assert!(step.run_just_finished);
        assert_eq!(s.run_state_of("less:c"), Some(TaskRunState::Skipped));
    }

    #[test]
    fn duplicate_triggers_within_a_run_are_ignored() {
        let mut s = scheduler(&["less:a"]);
        s.start_new_run();
        s.handle_trigger("less:a");
        assert!(s.handle_trigger("less:a").is_empty());
        assert_eq!(s.tasks_in_current_run(), vec!["less:a".to_string()]);
    }

    #[test]
    fn run_ids_increase() {
        let mut s = scheduler(&["less:a"]);
        let first = s.handle_trigger("less:a");
        s.handle_completion("less:a", TaskOutcome::Success);
        let second = s.handle_trigger("less:a");
        assert!(second[0].run_id > first[0].run_id);
    }

    #[test]
    fn unknown_tasks_finish_an_empty_run() {
        let mut s = scheduler(&["less:a"]);
        s.start_new_run();
        let step = s.step_trigger("less:nope");
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_just_finished);
        assert_eq!(s.run_state_of("less:nope"), None);
    }
}
