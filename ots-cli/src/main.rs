#![allow(clippy::multiple_crate_versions)]

use std::process::ExitCode;

use clap::Parser;

mod cache;
mod calendar;
mod cli;
mod commands;
mod config;
mod error;
mod verifier;

use calendar::SubmitStrategy;
use cli::{Cli, Command};
use config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    if cli.verbose {
        log::info!("Verbose mode enabled");
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches on `command`, returning the process exit code: `0` on success,
/// `1` on an ordinary failure (e.g. a timestamp that doesn't verify), and,
/// for `upgrade` specifically, `2` when nothing could be upgraded — distinct
/// from an error, since "still pending" isn't a failure.
async fn run(command: Command, config: &Config) -> error::Result<ExitCode> {
    match command {
        Command::Stamp { files, calendar, timeout, strategy } => {
            let strategy = match strategy {
                Some(s) => SubmitStrategy::parse(&s)
                    .ok_or_else(|| error::Error::Config(format!("unknown strategy '{s}'")))?,
                None => config.submit_strategy,
            };
            let calendar_urls = calendar.or_else(|| Some(config.calendar_urls.clone()));
            commands::stamp::execute(&files, calendar_urls, timeout, strategy, config.min_successful)
                .await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { file, target } => {
            let valid = commands::verify::execute(&file, target.as_deref(), config).await?;
            Ok(if valid { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Command::Upgrade { file, dry_run } => {
            let upgraded = commands::upgrade::execute(&file, dry_run, config).await?;
            Ok(if upgraded { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
        Command::Info { file, detailed } => {
            commands::info::execute(&file, detailed)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { file, target } => {
            let valid = commands::status::execute(&file, target.as_deref(), config).await?;
            Ok(if valid { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Command::Server { listen } => {
            println!(
                "server not implemented in this build; a calendar server is out of scope for a client (would listen on {listen})"
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
