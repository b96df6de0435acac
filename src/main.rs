// src/main.rs

use std::process::ExitCode;

use stylewatch::compile::CompileError;
use stylewatch::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("stylewatch: cannot set up logging: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// Compile errors already name the file and position; anything else gets
/// its full cause chain.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<CompileError>() {
        Some(compile) => eprintln!(">> {compile}\nAborted due to errors."),
        None => eprintln!("stylewatch error: {err:?}"),
    }
}
