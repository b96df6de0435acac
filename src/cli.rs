// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stylewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stylewatch",
    version,
    about = "Compile Less style-sheets to minified CSS and recompile on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run in order, e.g. `less:dist` or `watch`.
    ///
    /// Default: the `default` alias (which is `watch` unless configured).
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Stylewatch.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Stylewatch.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STYLEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved tasks, but don't compile or watch.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tasks_and_flags() {
        let args = CliArgs::try_parse_from([
            "stylewatch",
            "less:dist",
            "watch",
            "--config",
            "demos/Stylewatch.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.tasks, vec!["less:dist", "watch"]);
        assert_eq!(args.config, "demos/Stylewatch.toml");
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(!args.dry_run);
    }

    #[test]
    fn defaults_to_no_tasks_and_local_config() {
        let args = CliArgs::try_parse_from(["stylewatch"]).unwrap();
        assert!(args.tasks.is_empty());
        assert_eq!(args.config, "Stylewatch.toml");
    }
}
