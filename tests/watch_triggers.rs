// tests/watch_triggers.rs

use std::error::Error;
use std::sync::Arc;

use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

use stylewatch::config::{parse_str, ConfigFile};
use stylewatch::engine::{RuntimeEvent, TriggerReason};
use stylewatch::fs::RealFileSystem;
use stylewatch::types::WatchEventKind;
use stylewatch::watch::{build_profiles_from_config, spawn_watcher};
use stylewatch_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn config(debounce_ms: u64) -> ConfigFile {
    let toml = format!(
        r#"
        [less.dist.files]
        "nouveau/css/main.css" = "nouveau/css/main.less"

        [less.admin.files]
        "nouveau/css/admin.css" = "nouveau/css/admin.less"

        [watch.styles]
        files = ["nouveau/css/*.css", "nouveau/css/*.less"]
        tasks = ["less:dist"]
        options = {{ spawn = false, debounce_delay = {debounce_ms} }}

        [watch.admin]
        files = ["nouveau/css/admin.less"]
        tasks = ["less:admin"]
        options = {{ event = "deleted", debounce_delay = {debounce_ms} }}
        "#
    );
    ConfigFile::try_from(parse_str(&toml).unwrap()).unwrap()
}

/// Next `TasksTriggered` batch, or `None` if nothing arrives within `wait`.
async fn next_batch(
    rx: &mut mpsc::Receiver<RuntimeEvent>,
    wait: Duration,
) -> Option<(Vec<String>, TriggerReason)> {
    match timeout(wait, rx.recv()).await {
        Ok(Some(RuntimeEvent::TasksTriggered { tasks, reason })) => Some((tasks, reason)),
        _ => None,
    }
}

#[test]
fn profiles_carry_resolved_tasks_and_event_filters() -> TestResult {
    let cfg = config(50);
    let profiles = build_profiles_from_config(&cfg, &[])?;

    let styles = profiles.iter().find(|p| p.name() == "styles").unwrap();
    assert_eq!(styles.tasks(), ["less:dist".to_string()]);
    assert!(styles.matches("nouveau/css/theme.less", WatchEventKind::Added));
    assert!(!styles.matches("nouveau/css/img/logo.png", WatchEventKind::Added));

    let admin = profiles.iter().find(|p| p.name() == "admin").unwrap();
    assert!(admin.matches("nouveau/css/admin.less", WatchEventKind::Deleted));
    assert!(!admin.matches("nouveau/css/admin.less", WatchEventKind::Changed));

    let only_admin = build_profiles_from_config(&cfg, &["admin".to_string()])?;
    assert_eq!(only_admin.len(), 1);
    Ok(())
}

#[tokio::test]
async fn a_burst_of_writes_becomes_one_trigger() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let css_dir = dir.path().join("nouveau/css");
    std::fs::create_dir_all(&css_dir)?;
    std::fs::write(css_dir.join("main.less"), ".a { color: red; }")?;

    let cfg = config(200);
    let profiles = build_profiles_from_config(&cfg, &["styles".to_string()])?;
    let (tx, mut rx) = mpsc::channel(16);
    let _watcher = spawn_watcher(
        dir.path(),
        profiles,
        &cfg.destinations(),
        tx,
        Arc::new(RealFileSystem),
    )?;
    sleep(Duration::from_millis(100)).await;

    for i in 0..5 {
        std::fs::write(css_dir.join("main.less"), format!(".a {{ width: {i}px; }}"))?;
        sleep(Duration::from_millis(20)).await;
    }

    let (tasks, reason) = next_batch(&mut rx, Duration::from_secs(5))
        .await
        .expect("a trigger after the burst");
    assert_eq!(tasks, vec!["less:dist"]);
    assert_eq!(reason, TriggerReason::FileWatch);

    assert!(
        next_batch(&mut rx, Duration::from_millis(600)).await.is_none(),
        "the burst must be debounced into a single trigger"
    );
    Ok(())
}

#[tokio::test]
async fn writing_a_compile_destination_does_not_trigger() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let css_dir = dir.path().join("nouveau/css");
    std::fs::create_dir_all(&css_dir)?;

    let cfg = config(50);
    let profiles = build_profiles_from_config(&cfg, &["styles".to_string()])?;
    let (tx, mut rx) = mpsc::channel(16);
    let _watcher = spawn_watcher(
        dir.path(),
        profiles,
        &cfg.destinations(),
        tx,
        Arc::new(RealFileSystem),
    )?;
    sleep(Duration::from_millis(100)).await;

    std::fs::write(css_dir.join("main.css"), ".a{color:red}")?;
    assert!(next_batch(&mut rx, Duration::from_millis(500)).await.is_none());

    std::fs::write(css_dir.join("extra.css"), ".b{color:blue}")?;
    let (tasks, _) = next_batch(&mut rx, Duration::from_secs(5))
        .await
        .expect("a trigger for a new style-sheet");
    assert_eq!(tasks, vec!["less:dist"]);
    Ok(())
}
