// tests/compile_end_to_end.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};

use stylewatch::cli::CliArgs;
use stylewatch::compile::{compile, CompileError};
use stylewatch::config::load_and_validate;
use stylewatch::fs::RealFileSystem;
use stylewatch::run_compile_task;
use stylewatch_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

/// Copy `demos/` into a fresh temporary project.
fn demo_project() -> Result<TempDir, Box<dyn Error>> {
    let src = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos");
    let dir = tempdir()?;
    copy_dir(&src, dir.path())?;
    Ok(dir)
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn args(config: &Path, tasks: &[&str]) -> CliArgs {
    CliArgs {
        tasks: tasks.iter().map(|t| t.to_string()).collect(),
        config: config.to_string_lossy().into_owned(),
        log_level: None,
        dry_run: false,
    }
}

#[test]
fn demo_project_compiles_to_minified_css() -> TestResult {
    init_tracing();

    let project = demo_project()?;
    let cfg = load_and_validate(project.path().join("Stylewatch.toml"))?;

    run_compile_task(&RealFileSystem, &cfg, "dist")?;

    let css = fs::read_to_string(project.path().join("nouveau/css/main.css"))?;
    assert!(!css.contains('\n'), "minified output is a single line: {css}");
    assert!(!css.contains("@import"), "imports were inlined: {css}");
    assert!(!css.contains("@gutter"), "variables were evaluated: {css}");
    assert!(css.contains("@media"), "media query kept: {css}");
    assert!(css.contains("{.nav{padding:6px}}"), "media bubbled out of .nav: {css}");
    assert!(!css.contains("/*"), "special comments are dropped: {css}");
    assert!(css.contains("margin:0"), "reset.css was inlined: {css}");
    assert!(css.contains(".nav a:hover{color:#fff}"), "nesting was flattened: {css}");
    assert!(css.contains("border-radius:4px"), "mixin was applied: {css}");
    Ok(())
}

#[test]
fn compile_report_lists_sources_and_imports() -> TestResult {
    let project = demo_project()?;
    let cfg = load_and_validate(project.path().join("Stylewatch.toml"))?;
    let job = &cfg.compile_jobs("dist")[0];

    let report = compile(&RealFileSystem, job)?;

    assert_eq!(report.sources.len(), 1);
    assert!(report.sources[0].ends_with("nouveau/css/main.less"));
    assert!(report.imports.iter().any(|p| p.ends_with("variables.less")));
    assert_eq!(
        report.bytes as u64,
        fs::metadata(project.path().join("nouveau/css/main.css"))?.len()
    );
    Ok(())
}

#[test]
fn syntax_error_leaves_previous_output_untouched() -> TestResult {
    init_tracing();

    let project = demo_project()?;
    let cfg = load_and_validate(project.path().join("Stylewatch.toml"))?;
    let main_css = project.path().join("nouveau/css/main.css");
    run_compile_task(&RealFileSystem, &cfg, "dist")?;
    let before = fs::read_to_string(&main_css)?;

    fs::write(
        project.path().join("nouveau/css/main.less"),
        ".broken { color: @undefined; }",
    )?;
    let err = compile(&RealFileSystem, &cfg.compile_jobs("dist")[0]).unwrap_err();

    assert!(matches!(err, CompileError::Syntax(_)), "got {err:?}");
    assert_eq!(fs::read_to_string(&main_css)?, before);
    Ok(())
}

#[test]
fn missing_source_is_reported() -> TestResult {
    let project = demo_project()?;
    fs::remove_file(project.path().join("nouveau/css/main.less"))?;
    let cfg = load_and_validate(project.path().join("Stylewatch.toml"))?;

    let err = compile(&RealFileSystem, &cfg.compile_jobs("dist")[0]).unwrap_err();
    assert!(matches!(err, CompileError::SourceNotFound { .. }), "got {err:?}");
    assert!(!project.path().join("nouveau/css/main.css").exists());
    Ok(())
}

#[tokio::test]
async fn run_executes_compile_tasks_from_the_command_line() -> TestResult {
    init_tracing();

    let project = demo_project()?;
    let config = project.path().join("Stylewatch.toml");

    stylewatch::run(args(&config, &["less"])).await?;

    assert!(project.path().join("nouveau/css/main.css").is_file());
    Ok(())
}

#[tokio::test]
async fn run_fails_on_a_compile_error() -> TestResult {
    let project = demo_project()?;
    fs::write(project.path().join("nouveau/css/main.less"), ".a { .nope(); }")?;
    let config = project.path().join("Stylewatch.toml");

    let err = stylewatch::run(args(&config, &["less:dist"])).await.unwrap_err();
    assert!(err.downcast_ref::<CompileError>().is_some(), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn run_rejects_unknown_tasks() -> TestResult {
    let project = demo_project()?;
    let config = project.path().join("Stylewatch.toml");

    let err = stylewatch::run(args(&config, &["uglify"])).await.unwrap_err();
    assert!(err.to_string().contains("Task not found"), "got {err}");
    Ok(())
}

#[tokio::test]
async fn dry_run_writes_nothing() -> TestResult {
    let project = demo_project()?;
    let config = project.path().join("Stylewatch.toml");
    let mut dry = args(&config, &["less:dist", "watch"]);
    dry.dry_run = true;

    stylewatch::run(dry).await?;

    assert!(!project.path().join("nouveau/css/main.css").exists());
    Ok(())
}
