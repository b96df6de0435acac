// tests/trigger_behaviour.rs

//! What happens to changes that arrive while a compile run is in progress.

use stylewatch::engine::{
    CoreCommand, CoreRuntime, CoreStep, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use stylewatch::tasks::Scheduler;
use stylewatch_test_utils::builders::ConfigFileBuilder;
use stylewatch_test_utils::init_tracing;

fn core(behaviour: TriggerWhileRunningBehaviour) -> CoreRuntime {
    let cfg = ConfigFileBuilder::new()
        .less("a", "a.css", "a.less")
        .less("b", "b.css", "b.less")
        .behaviour(behaviour)
        .build();
    CoreRuntime::new(
        Scheduler::from_config(&cfg),
        behaviour,
        cfg.config_section().queue_length,
        RuntimeOptions::default(),
    )
}

fn changed(tasks: &[&str]) -> RuntimeEvent {
    RuntimeEvent::TasksTriggered {
        tasks: tasks.iter().map(|s| s.to_string()).collect(),
        reason: TriggerReason::FileWatch,
    }
}

fn done(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.to_string(),
        outcome: TaskOutcome::Success,
    }
}

fn dispatched(step: CoreStep) -> Vec<String> {
    step.commands
        .into_iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchTasks(tasks) => Some(tasks),
            CoreCommand::RequestExit => None,
        })
        .flatten()
        .map(|t| t.name)
        .collect()
}

/// Run `[a, b]`; while `a` compiles it changes again, while `b` compiles it
/// changes again too.
fn retrigger_both(core: &mut CoreRuntime) -> Vec<String> {
    assert_eq!(dispatched(core.step(changed(&["less:a", "less:b"]))), vec!["less:a"]);
    assert!(dispatched(core.step(changed(&["less:a"]))).is_empty());
    assert_eq!(dispatched(core.step(done("less:a"))), vec!["less:b"]);
    assert!(dispatched(core.step(changed(&["less:b"]))).is_empty());

    // `b` finishing drains the queue into the follow-up run.
    dispatched(core.step(done("less:b")))
}

#[test]
fn queue_mode_recompiles_everything_that_changed_mid_run() {
    init_tracing();
    let mut core = core(TriggerWhileRunningBehaviour::Queue);

    assert_eq!(retrigger_both(&mut core), vec!["less:a"]);
    assert_eq!(dispatched(core.step(done("less:a"))), vec!["less:b"]);
    assert!(dispatched(core.step(done("less:b"))).is_empty());
    assert!(core.is_idle());
}

#[test]
fn cancel_mode_keeps_only_the_latest_change() {
    init_tracing();
    let mut core = core(TriggerWhileRunningBehaviour::Cancel);

    assert_eq!(retrigger_both(&mut core), vec!["less:b"]);
    assert!(dispatched(core.step(done("less:b"))).is_empty());
    assert!(core.is_idle());
    assert!(core.queue_is_empty());
}

#[test]
fn a_change_to_a_pending_task_is_absorbed_by_the_current_run() {
    init_tracing();
    let mut core = core(TriggerWhileRunningBehaviour::Queue);

    core.step(changed(&["less:a", "less:b"]));
    assert!(dispatched(core.step(changed(&["less:b"]))).is_empty());
    assert!(core.queue_is_empty());
}
