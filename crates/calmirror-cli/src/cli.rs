//! Command-line interface definition.

use std::path::PathBuf;

use calmirror_core::TracingOutputFormat;
use clap::{Parser, Subcommand};

/// calmirror - mirror one calendar into another
#[derive(Debug, Parser)]
#[command(name = "calmirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "CALMIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<TracingOutputFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one sync and exit (the default)
    Sync,

    /// List calendars visible to the authenticated account
    Calendars,

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    #[cfg(feature = "google")]
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_sync() {
        let cli = Cli::try_parse_from(["calmirror"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "calmirror",
            "sync",
            "--log-format",
            "json",
            "--config",
            "/etc/calmirror.toml",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::Sync)));
        assert_eq!(cli.log_format, Some(TracingOutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/calmirror.toml")));
    }

    #[test]
    fn bad_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["calmirror", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn config_actions() {
        let cli = Cli::try_parse_from(["calmirror", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Validate
            })
        ));
    }

    #[cfg(feature = "google")]
    #[test]
    fn auth_google_flags() {
        let cli = Cli::try_parse_from([
            "calmirror",
            "auth",
            "google",
            "--credentials-file",
            "creds.json",
            "--force",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Auth {
                provider:
                    AuthProvider::Google {
                        credentials_file,
                        force,
                        ..
                    },
            }) => {
                assert_eq!(credentials_file, Some(PathBuf::from("creds.json")));
                assert!(force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
