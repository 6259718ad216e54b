//! hookprobe CLI entry point.
//!
//! Resolves configuration, initializes logging, dispatches to a subcommand
//! handler, and maps the outcome to a process exit code.

mod cli;
mod commands;
mod error;
mod logging;
mod metrics_server;
mod output;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use hookprobe_core::config::{GeneralConfig, HookprobeConfig};

use crate::cli::{Cli, Commands, LoadAction};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let resolved = commands::config::resolve(cli.config.as_deref()).await;

    // `config validate` must still report on a broken file, so logging falls
    // back to defaults when resolution fails.
    let general = resolved
        .as_ref()
        .map(|(config, _)| config.general.clone())
        .unwrap_or_else(|_| GeneralConfig::default());
    logging::init_tracing(&general, cli.log_level.as_deref())
        .map_err(|e| CliError::Command(e.to_string()))?;

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Config(args) => {
            commands::config::execute(args, cli.config.as_deref(), &writer).await
        }
        Commands::Integration(args) => {
            let config = resolved?.0;
            start_metrics(&config)?;
            commands::integration::execute(args, &config, &writer).await
        }
        Commands::Load(args) => {
            let config = resolved?.0;
            if matches!(args.action, LoadAction::Run { .. }) {
                start_metrics(&config)?;
            }
            commands::load::execute(args, &config.load, &writer).await
        }
        Commands::Scenarios(args) => {
            let config = resolved?.0;
            commands::scenarios::execute(args, &config, &writer).await
        }
    }
}

/// Exposes the Prometheus endpoint for commands that send traffic.
fn start_metrics(config: &HookprobeConfig) -> Result<(), CliError> {
    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)
            .map_err(|e| CliError::Command(e.to_string()))?;
    }
    Ok(())
}
