// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use stylewatch::config::ConfigFile;
use stylewatch::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use stylewatch::tasks::Scheduler;
use stylewatch_test_utils::builders::ConfigFileBuilder;
use stylewatch_test_utils::fake_executor::FakeExecutor;
use stylewatch_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn two_target_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .less("admin", "admin.css", "admin.less")
        .less("dist", "main.css", "main.less")
        .watch("styles", &["*.less"], &["less"])
        .build()
}

async fn run_batch(
    cfg: &ConfigFile,
    tasks: &[&str],
    failing: Option<&str>,
) -> Result<Vec<(String, u64)>, Box<dyn Error>> {
    let scheduler = Scheduler::from_config(cfg);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);

    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut executor = FakeExecutor::new(rt_tx.clone(), executed.clone());
    if let Some(task) = failing {
        executor = executor.with_outcome(task, TaskOutcome::Failed(1));
    }

    rt_tx
        .send(RuntimeEvent::TasksTriggered {
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            reason: TriggerReason::FileWatch,
        })
        .await?;

    let core = CoreRuntime::new(
        scheduler,
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let runtime = Runtime::new(core, rt_rx, executor);

    timeout(Duration::from_secs(3), runtime.run()).await??;

    let executed = executed.lock().unwrap().clone();
    Ok(executed)
}

#[tokio::test]
async fn one_batch_runs_its_tasks_in_order_within_one_run() -> TestResult {
    init_tracing();

    let executed = run_batch(&two_target_config(), &["less:dist", "less:admin"], None).await?;

    let names: Vec<&str> = executed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["less:dist", "less:admin"]);
    assert_eq!(executed[0].1, executed[1].1, "both tasks share one run id");
    Ok(())
}

#[tokio::test]
async fn a_failed_task_skips_the_rest_of_its_run() -> TestResult {
    init_tracing();

    let executed = run_batch(
        &two_target_config(),
        &["less:admin", "less:dist"],
        Some("less:admin"),
    )
    .await?;

    let names: Vec<&str> = executed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["less:admin"]);
    Ok(())
}

#[tokio::test]
async fn duplicate_tasks_in_a_batch_run_once() -> TestResult {
    init_tracing();

    let executed = run_batch(&two_target_config(), &["less:dist", "less:dist"], None).await?;
    assert_eq!(executed.len(), 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_request_stops_an_idle_runtime() -> TestResult {
    init_tracing();

    let cfg = two_target_config();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(4);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());
    let core = CoreRuntime::new(
        Scheduler::from_config(&cfg),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions::default(),
    );

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    timeout(Duration::from_secs(3), Runtime::new(core, rt_rx, executor).run()).await??;

    assert!(executed.lock().unwrap().is_empty());
    Ok(())
}
