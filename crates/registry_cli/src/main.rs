//! `registry` command-line entry point.
//!
//! # Responsibility
//! - Parse flags and environment into a `Cli`.
//! - Start logging, then hand off to `commands::run`.
//! - Map outcomes to exit codes: 0 ok, 1 error, 2 tolerated warning.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use commands::CliError;
use log::{error, warn};
use std::process::ExitCode;

const EXIT_WARNING: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stderr shares the terminal with command output
    let level = match (&cli.log_level, &cli.log_dir) {
        (Some(level), _) => level.clone(),
        (None, Some(_)) => registry_core::default_log_level().to_string(),
        (None, None) => "warn".to_string(),
    };
    if let Err(message) = registry_core::init_logging(&level, cli.log_dir.as_deref()) {
        eprintln!("error: {}", CliError::Logging(message));
        return ExitCode::FAILURE;
    }

    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_warning() => {
            warn!("event=cli_command module=cli status=warn error={err}");
            eprintln!("warning: {err}");
            ExitCode::from(EXIT_WARNING)
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
