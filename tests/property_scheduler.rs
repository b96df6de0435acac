// tests/property_scheduler.rs

use std::collections::BTreeSet;

use proptest::prelude::*;
use stylewatch::engine::{
    CoreCommand, CoreRuntime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use stylewatch::tasks::Scheduler;
use stylewatch_test_utils::builders::ConfigFileBuilder;

const TARGETS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone)]
enum Op {
    /// One watch batch: indices into `TARGETS`.
    Trigger(Vec<usize>),
    /// Finish the running task, if any.
    Complete { fail: bool },
}

fn op_strategy(allow_failures: bool) -> impl Strategy<Value = Op> {
    prop_oneof![
        proptest::collection::vec(0..TARGETS.len(), 1..4).prop_map(Op::Trigger),
        any::<bool>().prop_map(move |f| Op::Complete {
            fail: allow_failures && f
        }),
    ]
}

fn core(behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> CoreRuntime {
    let mut builder = ConfigFileBuilder::new();
    for t in TARGETS {
        builder = builder.less(t, &format!("{t}.css"), &format!("{t}.less"));
    }
    let cfg = builder.build();
    CoreRuntime::new(
        Scheduler::from_config(&cfg),
        behaviour,
        queue_length,
        RuntimeOptions::default(),
    )
}

fn behaviour_strategy() -> impl Strategy<Value = TriggerWhileRunningBehaviour> {
    prop_oneof![
        Just(TriggerWhileRunningBehaviour::Queue),
        Just(TriggerWhileRunningBehaviour::Cancel),
    ]
}

/// Drives a core and checks that at most one task compiles at a time.
struct Harness {
    core: CoreRuntime,
    running: Option<String>,
}

impl Harness {
    /// Returns the tasks dispatched by this step.
    fn step(&mut self, event: RuntimeEvent) -> Result<Vec<String>, TestCaseError> {
        let step = self.core.step(event);
        prop_assert!(step.keep_running);
        let mut started = Vec::new();
        for command in step.commands {
            if let CoreCommand::DispatchTasks(tasks) = command {
                for task in tasks {
                    prop_assert!(
                        self.running.is_none(),
                        "{} dispatched while {:?} is running",
                        task.name,
                        self.running
                    );
                    started.push(task.name.clone());
                    self.running = Some(task.name);
                }
            }
        }
        Ok(started)
    }

    fn trigger(&mut self, tasks: Vec<String>) -> Result<Vec<String>, TestCaseError> {
        self.step(RuntimeEvent::TasksTriggered {
            tasks,
            reason: TriggerReason::FileWatch,
        })
    }

    fn complete(&mut self, fail: bool) -> Result<Vec<String>, TestCaseError> {
        let Some(task) = self.running.take() else {
            return Ok(Vec::new());
        };
        let outcome = if fail {
            TaskOutcome::Failed(1)
        } else {
            TaskOutcome::Success
        };
        self.step(RuntimeEvent::TaskCompleted { task, outcome })
    }

    /// Complete everything that is (or becomes) runnable.
    fn drain(&mut self) -> Result<(), TestCaseError> {
        let mut steps = 0;
        while self.running.is_some() {
            steps += 1;
            prop_assert!(steps < 1000, "runtime never went idle");
            self.complete(false)?;
        }
        Ok(())
    }
}

fn names(indices: &[usize]) -> Vec<String> {
    indices.iter().map(|i| format!("less:{}", TARGETS[*i])).collect()
}

proptest! {
    #[test]
    fn runtime_always_returns_to_idle(
        behaviour in behaviour_strategy(),
        queue_length in 1usize..4,
        ops in proptest::collection::vec(op_strategy(true), 1..40),
    ) {
        let mut h = Harness { core: core(behaviour, queue_length), running: None };

        for op in ops {
            match op {
                Op::Trigger(indices) => {
                    h.trigger(names(&indices))?;
                }
                Op::Complete { fail } => {
                    h.complete(fail)?;
                }
            }
        }
        h.drain()?;

        prop_assert!(h.core.is_idle());
        prop_assert!(h.core.queue_is_empty());
    }

    #[test]
    fn queue_mode_never_loses_a_change(
        queue_length in 1usize..4,
        ops in proptest::collection::vec(op_strategy(false), 1..40),
    ) {
        let mut h = Harness {
            core: core(TriggerWhileRunningBehaviour::Queue, queue_length),
            running: None,
        };

        // Tasks changed since they last started compiling.
        let mut stale: BTreeSet<String> = BTreeSet::new();
        for op in ops {
            let started = match op {
                Op::Trigger(indices) => {
                    let tasks = names(&indices);
                    stale.extend(tasks.iter().cloned());
                    h.trigger(tasks)?
                }
                Op::Complete { .. } => h.complete(false)?,
            };
            for task in started {
                stale.remove(&task);
            }
        }

        let mut steps = 0;
        while h.running.is_some() {
            steps += 1;
            prop_assert!(steps < 1000, "runtime never went idle");
            for task in h.complete(false)? {
                stale.remove(&task);
            }
        }

        prop_assert!(stale.is_empty(), "changes never compiled: {:?}", stale);
    }
}
