// tests/config_validation.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stylewatch::compile::SpecialComments;
use stylewatch::config::{load_and_validate, parse_str, ConfigFile};
use stylewatch::errors::StylewatchError;
use stylewatch::types::WatchEventKind;
use stylewatch_test_utils::builders::ConfigFileBuilder;
use stylewatch_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn validate(toml: &str) -> Result<ConfigFile, StylewatchError> {
    ConfigFile::try_from(parse_str(toml)?)
}

#[test]
fn demo_config_matches_the_documented_build() -> TestResult {
    init_tracing();

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest_dir.join("demos/Stylewatch.toml"))?;

    assert_eq!(cfg.root(), manifest_dir.join("demos").as_path());

    let jobs = cfg.compile_jobs("dist");
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.source_patterns, vec!["nouveau/css/main.less"]);
    assert_eq!(job.destination, Path::new("nouveau/css/main.css"));
    assert_eq!(job.include_paths, vec![PathBuf::from("nouveau/css")]);
    assert_eq!(job.optimization, 2);
    assert!(job.minifier.enabled);
    assert!(job.minifier.advanced);
    assert!(job.minifier.process_import);
    assert_eq!(job.minifier.keep_special_comments, SpecialComments::None);

    let styles = &cfg.watch_targets()["styles"];
    assert_eq!(styles.files, vec!["nouveau/css/*.css", "nouveau/css/*.less"]);
    assert_eq!(styles.tasks, vec!["less:dist"]);
    assert!(!styles.options.spawn);
    assert_eq!(styles.options.events, WatchEventKind::ALL.to_vec());
    assert_eq!(styles.options.debounce_delay, Duration::from_millis(500));

    assert_eq!(cfg.aliases()["default"], vec!["watch"]);
    Ok(())
}

#[test]
fn target_options_override_shared_ones() -> TestResult {
    let cfg = validate(
        r#"
        [less.options]
        paths = ["shared"]
        optimization = 1

        [less.options.clean_css]
        advanced = true
        keep_special_comments = "*"

        [less.site.files]
        "out/site.css" = ["a.less", "b.less"]

        [less.site.options]
        optimization = 2

        [less.site.options.clean_css]
        advanced = false
        keep_special_comments = 1
        "#,
    )?;

    let job = &cfg.compile_jobs("site")[0];
    assert_eq!(job.source_patterns, vec!["a.less", "b.less"]);
    assert_eq!(job.include_paths, vec![PathBuf::from("shared")]);
    assert_eq!(job.optimization, 2);
    assert!(!job.minifier.advanced);
    assert!(job.minifier.process_import);
    assert_eq!(job.minifier.keep_special_comments, SpecialComments::First);
    Ok(())
}

#[test]
fn missing_clean_css_table_disables_the_minifier() -> TestResult {
    let cfg = validate(
        r#"
        [less.dist.files]
        "main.css" = "main.less"
        "#,
    )?;
    assert!(!cfg.compile_jobs("dist")[0].minifier.enabled);
    Ok(())
}

#[test]
fn watch_defaults_follow_grunt_contrib_watch() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .watch("styles", &["*.less"], &["less"])
        .build();

    let styles = &cfg.watch_targets()["styles"];
    assert!(styles.options.spawn);
    assert!(!styles.options.at_begin);
    assert!(!styles.options.use_hash);
    assert_eq!(styles.options.events, WatchEventKind::ALL.to_vec());
    Ok(())
}

#[test]
fn event_list_accepts_all_and_single_names() -> TestResult {
    let cfg = validate(
        r#"
        [less.dist.files]
        "main.css" = "main.less"

        [watch.a]
        files = "*.less"
        tasks = "less:dist"
        options = { event = "changed" }

        [watch.b]
        files = "*.less"
        tasks = "less:dist"
        options = { event = ["all"] }
        "#,
    )?;
    assert_eq!(
        cfg.watch_targets()["a"].options.events,
        vec![WatchEventKind::Changed]
    );
    assert_eq!(
        cfg.watch_targets()["b"].options.events,
        WatchEventKind::ALL.to_vec()
    );
    Ok(())
}

#[test]
fn a_config_without_less_targets_is_rejected() {
    let err = validate("[watch.styles]\nfiles = [\"*.less\"]\ntasks = [\"less\"]\n").unwrap_err();
    assert!(matches!(err, StylewatchError::ConfigError(_)), "got {err:?}");
}

#[test]
fn optimization_outside_zero_to_two_is_rejected() {
    let err = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .optimization(3)
        .try_build()
        .unwrap_err();
    assert!(err.to_string().contains("optimization"), "got {err}");
}

#[test]
fn alias_cycles_are_rejected() {
    let err = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .alias("build", &["styles"])
        .alias("styles", &["build"])
        .try_build()
        .unwrap_err();
    assert!(matches!(err, StylewatchError::AliasCycle(_)), "got {err:?}");
}

#[test]
fn aliases_may_not_shadow_builtin_tasks() {
    let err = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .alias("less", &["less:dist"])
        .try_build()
        .unwrap_err();
    assert!(err.to_string().contains("shadow"), "got {err}");
}

#[test]
fn watch_targets_must_reference_known_compile_tasks() {
    let unknown = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .watch("styles", &["*.less"], &["less:admin"])
        .try_build()
        .unwrap_err();
    assert!(unknown.to_string().contains("unknown task"), "got {unknown}");

    let nested = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .watch("styles", &["*.less"], &["watch"])
        .try_build()
        .unwrap_err();
    assert!(nested.to_string().contains("cannot trigger watch task"), "got {nested}");
}

#[test]
fn unknown_event_names_are_rejected() {
    let err = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .watch("styles", &["*.less"], &["less:dist"])
        .watch_events(&["renamed"])
        .try_build()
        .unwrap_err();
    assert!(err.to_string().contains("invalid watch event"), "got {err}");
}

#[test]
fn queue_length_zero_is_rejected() {
    let err = ConfigFileBuilder::new()
        .less("dist", "main.css", "main.less")
        .queue_length(0)
        .try_build()
        .unwrap_err();
    assert!(err.to_string().contains("queue_length"), "got {err}");
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let err = parse_str("[less.dist.files\n").unwrap_err();
    assert!(matches!(err, StylewatchError::TomlError(_)), "got {err:?}");
}
