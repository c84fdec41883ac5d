//! calmirror CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use calmirror_cli::cli::{AuthProvider, Cli, Command, ConfigAction};
use calmirror_cli::commands;
use calmirror_cli::config::ClientConfig;
use calmirror_cli::error::ClientResult;
use calmirror_core::init_tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tracing_config = config.logging.tracing_config(cli.debug, cli.log_format);
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "calmirror failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);

    match cli.command.unwrap_or(Command::Sync) {
        Command::Sync => commands::sync::run(config).await,
        Command::Calendars => commands::calendars::run(config).await,
        Command::Auth { provider } => match provider {
            #[cfg(feature = "google")]
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                commands::auth::google(
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    config,
                    &config_path,
                )
                .await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(config, &config_path),
            ConfigAction::Validate => commands::config::validate(config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
