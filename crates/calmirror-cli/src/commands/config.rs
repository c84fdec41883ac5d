//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Renders the effective configuration, defaults included.
pub fn render(config: &ClientConfig) -> ClientResult<String> {
    toml::to_string_pretty(config)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))
}

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", path.display());
    println!("{}", render(config)?);
    Ok(())
}

/// Checks everything a sync run needs from the configuration.
pub fn check(config: &ClientConfig) -> ClientResult<()> {
    config.sync.validate()?;

    #[cfg(feature = "google")]
    match config.google {
        Some(ref google) => {
            google.to_provider_config()?;
        }
        None => {
            return Err(ClientError::config(
                "no [google] section configured - run 'calmirror auth google'",
            ));
        }
    }

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    check(config)?;
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
