//! campusmeet CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use campusmeet_cli::cli::{Cli, Command, ConfigAction};
use campusmeet_cli::commands;
use campusmeet_cli::config::ClientConfig;
use campusmeet_cli::error::ClientResult;
use campusmeet_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut tracing_config = if cli.debug || config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    }
    .with_format(cli.log_format.into());
    if let Some(filter) = &cli.log_filter {
        tracing_config = tracing_config.with_env_filter(filter.clone());
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> ClientResult<ClientConfig> {
    match path {
        Some(path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    match cli.command {
        Command::Expand {
            snapshot,
            meeting,
            from,
            to,
            count_policy,
            json,
        } => {
            commands::expand::run(
                &config,
                snapshot,
                meeting,
                from,
                to,
                count_policy.map(Into::into),
                json,
            )
            .await
        }
        Command::Check { snapshot } => commands::check::run(&config, snapshot),
        Command::Request {
            snapshot,
            input,
            save,
        } => commands::request::run(&config, snapshot, input, save).await,
        Command::Config { action } => {
            let path = cli.config.unwrap_or_else(ClientConfig::default_path);
            match action {
                ConfigAction::Dump => commands::config::dump(&config, &path),
                ConfigAction::Validate => commands::config::validate(&config),
                ConfigAction::Path => commands::config::path(&path),
            }
        }
    }
}
