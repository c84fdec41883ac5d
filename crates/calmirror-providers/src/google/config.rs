//! Google Calendar gateway configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Shape of a downloaded credentials JSON file: either the Cloud Console
/// format with an `installed`/`web` section, or a flat one.
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    ///
    /// Accepts `{"installed": {...}}`, `{"web": {...}}` and the flat
    /// `{"client_id": ..., "client_secret": ...}` form.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: GoogleCredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(ProviderError::configuration(
            "credentials file must contain 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Checks that the client id looks like a Google one and the secret is set.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Google Calendar gateway.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Account name, used in the gateway name and the default token path.
    /// Defaults to `"default"`.
    pub account_name: String,

    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// Path to store OAuth tokens.
    ///
    /// Defaults to `~/.local/share/calmirror/google-tokens-{account}.json`.
    pub token_path: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth server.
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request.
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write calendar access, needed to create and delete mirrored events.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a new Google configuration with the given credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            account_name: "default".to_string(),
            credentials,
            token_path: Self::default_token_path("default"),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calmirror/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    /// Returns the default token storage path for a given account name.
    pub fn default_token_path(account_name: &str) -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calmirror")
            .join(format!("google-tokens-{}.json", account_name))
    }

    /// Sets the account name, moving the token path along while it is
    /// still the default one.
    pub fn with_account_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.token_path == Self::default_token_path(&self.account_name) {
            self.token_path = Self::default_token_path(&name);
        }
        self.account_name = name;
        self
    }

    /// Returns the gateway name for this account (e.g. `"google:work"`).
    pub fn provider_name(&self) -> String {
        format!("google:{}", self.account_name)
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials
            .validate()
            .map_err(|e| ProviderError::configuration(format!("invalid credentials: {}", e)))?;

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::configuration("invalid loopback port range"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("bad-id", "secret").validate().is_err());
        assert!(
            OAuthCredentials::new("test.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn config_defaults_request_write_scope() {
        let config = GoogleConfig::new(test_credentials());
        assert_eq!(config.scopes, ["https://www.googleapis.com/auth/calendar"]);
        assert_eq!(config.provider_name(), "google:default");
        assert!(config.token_path.ends_with("calmirror/google-tokens-default.json"));
        assert!(config.user_agent.starts_with("calmirror/"));
    }

    #[test]
    fn account_name_moves_default_token_path() {
        let config = GoogleConfig::new(test_credentials()).with_account_name("work");
        assert!(config.token_path.ends_with("google-tokens-work.json"));
        assert_eq!(config.provider_name(), "google:work");

        let config = GoogleConfig::new(test_credentials())
            .with_token_path("/tmp/tokens.json")
            .with_account_name("work");
        assert_eq!(config.token_path, PathBuf::from("/tmp/tokens.json"));
    }

    #[test]
    fn config_validation() {
        assert!(GoogleConfig::new(test_credentials()).validate().is_ok());
        assert!(
            GoogleConfig::new(test_credentials())
                .with_scopes(vec![])
                .validate()
                .is_err()
        );
        assert!(
            GoogleConfig::new(test_credentials())
                .with_loopback_port_range(9010, 9000)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(
            creds,
            OAuthCredentials::new("test-id.apps.googleusercontent.com", "test-secret")
        );
    }

    #[test]
    fn credentials_from_json_web_and_flat() {
        let web = r#"{ "web": { "client_id": "web-id", "client_secret": "web-secret" } }"#;
        assert_eq!(OAuthCredentials::from_json(web).unwrap().client_id, "web-id");

        let flat = r#"{ "client_id": "flat-id", "client_secret": "flat-secret", "token": "x" }"#;
        assert_eq!(
            OAuthCredentials::from_json(flat).unwrap().client_secret,
            "flat-secret"
        );
    }

    #[test]
    fn credentials_from_json_invalid() {
        let err = OAuthCredentials::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert!(err.message().contains("client_id"));

        let err = OAuthCredentials::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn credentials_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret.json");
        std::fs::write(
            &path,
            r#"{ "installed": { "client_id": "a.apps.googleusercontent.com", "client_secret": "s" } }"#,
        )
        .unwrap();

        let creds = OAuthCredentials::from_file(&path).unwrap();
        assert_eq!(creds.client_id, "a.apps.googleusercontent.com");
        assert!(OAuthCredentials::from_file(dir.path().join("missing.json")).is_err());
    }
}
