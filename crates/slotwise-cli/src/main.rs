//! slotwise CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use slotwise_core::{TracingConfig, init_tracing};

use slotwise_cli::cli::{Cli, Command};
use slotwise_cli::commands;
use slotwise_cli::error::CliResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = match cli.command {
        Command::Sync { watch: true } if !cli.debug => TracingConfig::watch(),
        _ => TracingConfig::for_cli(cli.debug),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    let engine = commands::build_engine(&config, cli.fixture.as_deref())?;

    match cli.command {
        Command::Sync { watch: false } => commands::sync::once(&engine).await,
        Command::Sync { watch: true } => {
            commands::sync::watch(&engine, config.sync.poll_config()).await
        }
        Command::Availability { range, json } => {
            commands::availability::run(&engine, &range, json).await
        }
        Command::View {
            range,
            free,
            viewer,
        } => commands::view::run(&engine, &range, free, viewer).await,
    }
}
