// tests/watch_recovery.rs

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;

use stylewatch::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour, WatchSummary,
};
use stylewatch::exec::{ExecContext, RealExecutorBackend};
use stylewatch::fs::mock::MockFileSystem;
use stylewatch::tasks::Scheduler;
use stylewatch_test_utils::builders::ConfigFileBuilder;
use stylewatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn change() -> RuntimeEvent {
    RuntimeEvent::TasksTriggered {
        tasks: vec!["less:dist".to_string()],
        reason: TriggerReason::FileWatch,
    }
}

/// Wait for the executor to finish one compile, pass the completion on to
/// the runtime and return its outcome.
async fn next_outcome(
    exec_rx: &mut mpsc::Receiver<RuntimeEvent>,
    rt_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<TaskOutcome, Box<dyn Error>> {
    let event = with_timeout(exec_rx.recv())
        .await
        .ok_or("executor stopped")?;
    let RuntimeEvent::TaskCompleted { outcome, .. } = &event else {
        return Err(format!("unexpected event: {event:?}").into());
    };
    let outcome = *outcome;
    rt_tx.send(event).await?;
    Ok(outcome)
}

#[tokio::test]
async fn a_failed_compile_does_not_stop_the_next_change_from_compiling() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .watch("styles", &["*.less"], &["less:dist"])
        .watch_spawn(false)
        .build();

    let fs = MockFileSystem::new();
    fs.add_file("main.less", ".a { color: @undefined; }");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    // Completions come back through the test so each trigger can be checked.
    let (exec_tx, mut exec_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = RealExecutorBackend::new(
        ExecContext {
            fs: Arc::new(fs.clone()),
            config_path: "Stylewatch.toml".into(),
        },
        exec_tx,
    );
    let core = CoreRuntime::new(
        Scheduler::from_config(&cfg),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions::default(),
    );
    let runtime = tokio::spawn(Runtime::new(core, rt_rx, executor).run());

    rt_tx.send(change()).await?;
    assert_eq!(next_outcome(&mut exec_rx, &rt_tx).await?, TaskOutcome::Failed(1));
    assert_eq!(fs.contents("main.css"), None);

    fs.add_file("main.less", ".a { color: red; }");
    rt_tx.send(change()).await?;
    assert_eq!(next_outcome(&mut exec_rx, &rt_tx).await?, TaskOutcome::Success);
    assert_eq!(fs.contents("main.css").as_deref(), Some(".a {\n  color: red;\n}\n"));

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    let summary = with_timeout(runtime).await??;
    assert_eq!(
        summary,
        WatchSummary {
            runs: 2,
            failed_runs: 1,
        }
    );
    Ok(())
}
