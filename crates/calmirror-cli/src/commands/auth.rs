//! Authentication commands.

use std::path::{Path, PathBuf};

use calmirror_providers::google::{GoogleConfig, GoogleGateway, OAuthCredentials};
use tracing::{info, warn};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Where the credentials were resolved from.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// From CLI flags (--client-id/--client-secret or --credentials-file)
    Cli,
    /// From config.toml (already persisted)
    Config,
}

/// Runs the Google authentication flow.
///
/// Credentials come from CLI flags, a `--credentials-file`, or the
/// `[google]` section. Credentials given on the command line are written
/// to `config_path` so later sync runs find them.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let (credentials, source) = resolve_google_credentials(
        client_id,
        client_secret,
        credentials_file,
        config.google.as_ref(),
    )?;
    credentials
        .validate()
        .map_err(|e| ClientError::config(format!("invalid Google credentials: {}", e)))?;

    let google_config = match config.google {
        Some(ref settings) => GoogleSettings {
            client_id: Some(credentials.client_id.clone()),
            client_secret: Some(credentials.client_secret.clone()),
            ..settings.clone()
        }
        .to_provider_config()?,
        None => GoogleConfig::new(credentials.clone()),
    };

    let gateway = GoogleGateway::new(google_config)?;

    if !force && gateway.is_authenticated().await && !gateway.needs_reauth().await {
        persist(&credentials, &source, config_path);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    gateway.authenticate().await?;
    persist(&credentials, &source, config_path);

    info!("Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!("Run 'calmirror calendars' to find the ids for the [sync] section.");

    Ok(())
}

fn persist(credentials: &OAuthCredentials, source: &CredentialSource, config_path: &Path) {
    if *source == CredentialSource::Config {
        return;
    }
    match save_credentials_to_config(config_path, &credentials.client_id, &credentials.client_secret) {
        Ok(()) => println!("Credentials saved to {}", config_path.display()),
        Err(e) => warn!(
            path = %config_path.display(),
            error = %e,
            "could not save credentials"
        ),
    }
}

/// Writes credentials into the `[google]` table of `config_path`, keeping
/// every other key and comment in the file.
fn save_credentials_to_config(
    config_path: &Path,
    client_id: &str,
    client_secret: &str,
) -> ClientResult<()> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::config(format!("could not parse {}: {}", config_path.display(), e))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::config(format!("'google' in {} is not a table", config_path.display()))
    })?;
    google["client_id"] = toml_edit::value(client_id);
    google["client_secret"] = toml_edit::value(client_secret);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;

    info!(path = %config_path.display(), "credentials saved");
    Ok(())
}

/// Resolves Google credentials from multiple sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret`
/// 2. CLI `--credentials-file` (Google Cloud Console JSON)
/// 3. `config.toml` `[google]` section, with secret resolution
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((OAuthCredentials::new(id, secret), CredentialSource::Cli));
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((creds, CredentialSource::Cli));
    }

    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::config(
            "both --client-id and --client-secret are required when providing credentials directly",
        ));
    }

    if let Some(google) = config_google
        && google.client_id.is_some()
        && google.client_secret.is_some()
    {
        return Ok((google.resolve_credentials()?, CredentialSource::Config));
    }

    Err(ClientError::config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in the [google] section of {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_settings() -> GoogleSettings {
        GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_credentials_from_cli() {
        let (creds, source) = resolve_google_credentials(
            Some("cli-id.apps.googleusercontent.com".to_string()),
            Some("cli-secret".to_string()),
            None,
            Some(&config_settings()),
        )
        .unwrap();
        assert_eq!(creds.client_id, "cli-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "cli-secret");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn resolve_credentials_from_config() {
        let (creds, source) =
            resolve_google_credentials(None, None, None, Some(&config_settings())).unwrap();
        assert_eq!(creds.client_id, "config-id.apps.googleusercontent.com");
        assert_eq!(source, CredentialSource::Config);
    }

    #[test]
    fn resolve_credentials_partial_cli_fails() {
        let result = resolve_google_credentials(
            Some("id.apps.googleusercontent.com".to_string()),
            None,
            None,
            Some(&config_settings()),
        );
        assert!(result.is_err());

        let result = resolve_google_credentials(None, Some("secret".to_string()), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn resolve_credentials_none_fails() {
        let err = resolve_google_credentials(None, None, None, None).unwrap_err();
        assert!(err.to_string().contains("Google credentials are required"));
    }

    #[test]
    fn resolve_credentials_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let creds_path = tmp.path().join("creds.json");
        std::fs::write(
            &creds_path,
            r#"{"installed": {"client_id": "file-id.apps.googleusercontent.com", "client_secret": "file-secret"}}"#,
        )
        .unwrap();

        let (creds, source) =
            resolve_google_credentials(None, None, Some(creds_path), None).unwrap();
        assert_eq!(creds.client_id, "file-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "file-secret");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn save_credentials_keeps_existing_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            "# my mirror\n[sync]\nsource_calendar_id = \"me@example.com\"\n",
        )
        .unwrap();

        save_credentials_to_config(&config_path, "test.apps.googleusercontent.com", "test-secret")
            .unwrap();

        let written = std::fs::read_to_string(&config_path).unwrap();
        assert!(written.starts_with("# my mirror"));

        let reloaded = ClientConfig::load_from(&config_path).unwrap();
        assert_eq!(reloaded.sync.source_calendar_id, "me@example.com");
        let google = reloaded.google.unwrap();
        assert_eq!(
            google.client_id.as_deref(),
            Some("test.apps.googleusercontent.com")
        );
        assert_eq!(google.client_secret.as_deref(), Some("test-secret"));
    }

    #[test]
    fn save_credentials_creates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("nested").join("config.toml");

        save_credentials_to_config(&config_path, "id.apps.googleusercontent.com", "s").unwrap();

        let reloaded = ClientConfig::load_from(&config_path).unwrap();
        assert!(reloaded.google.is_some());
    }

    #[test]
    fn save_credentials_rejects_non_table_google_key() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "google = \"oops\"\n").unwrap();

        assert!(save_credentials_to_config(&config_path, "id", "secret").is_err());
    }
}
