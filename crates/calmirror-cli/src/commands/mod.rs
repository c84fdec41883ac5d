//! Subcommand implementations.

#[cfg(feature = "google")]
pub mod auth;
pub mod calendars;
pub mod config;
pub mod sync;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Builds the gateway for the configured account and checks that its
/// stored tokens can read and write calendars.
#[cfg(feature = "google")]
pub async fn connect(
    config: &ClientConfig,
) -> ClientResult<calmirror_providers::google::GoogleGateway> {
    use calmirror_providers::google::GoogleGateway;

    let google = config.google.as_ref().ok_or_else(|| {
        ClientError::config("no [google] section configured - run 'calmirror auth google' first")
    })?;
    let gateway = GoogleGateway::new(google.to_provider_config()?)?;

    if !gateway.is_authenticated().await {
        return Err(ClientError::AuthRequired(
            "no usable Google tokens - run 'calmirror auth google'".to_string(),
        ));
    }
    if gateway.needs_reauth().await {
        return Err(ClientError::AuthRequired(
            "stored Google tokens lack calendar write access - run 'calmirror auth google --force'"
                .to_string(),
        ));
    }

    Ok(gateway)
}

#[cfg(not(feature = "google"))]
pub async fn connect(
    _config: &ClientConfig,
) -> ClientResult<calmirror_providers::MemoryGateway> {
    Err(ClientError::config(
        "calmirror was built without a calendar backend; enable the 'google' feature",
    ))
}
