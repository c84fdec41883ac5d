//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calmirror/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};

use calmirror_core::{ExclusionConfig, TracingConfig, TracingOutputFormat};
use calmirror_sync::{DEFAULT_FUTURE_DAYS, DEFAULT_MARKER, SyncSettings};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// All-day titles containing one of these are not mirrored unless the
/// config says otherwise.
pub const DEFAULT_EXCLUDE_KEYWORDS: &[&str] = &[
    "home",
    "office",
    "working from home",
    "working from office",
    "work from home",
    "work from office",
    "flexible",
    "hybrid",
    "out of office",
];

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the calmirror client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// What to mirror where.
    pub sync: SyncSection,

    /// Google Calendar settings.
    #[cfg(feature = "google")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleSettings>,

    /// Log output settings.
    pub logging: LoggingSettings,
}

/// The `[sync]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub source_calendar_id: String,
    pub destination_calendar_id: String,
    pub marker: String,
    pub past_days: u32,
    pub future_days: u32,
    pub exclude_keywords: ExclusionConfig,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            source_calendar_id: String::new(),
            destination_calendar_id: String::new(),
            marker: DEFAULT_MARKER.to_string(),
            past_days: 0,
            future_days: DEFAULT_FUTURE_DAYS,
            exclude_keywords: ExclusionConfig::new(DEFAULT_EXCLUDE_KEYWORDS),
        }
    }
}

impl SyncSection {
    /// Checks the values a run cannot do without.
    pub fn validate(&self) -> ClientResult<()> {
        if self.source_calendar_id.trim().is_empty() {
            return Err(ClientError::config("sync.source_calendar_id is not set"));
        }
        if self.destination_calendar_id.trim().is_empty() {
            return Err(ClientError::config("sync.destination_calendar_id is not set"));
        }
        if self.source_calendar_id.trim() == self.destination_calendar_id.trim() {
            return Err(ClientError::config(
                "sync.source_calendar_id and sync.destination_calendar_id must differ",
            ));
        }
        if self.marker.trim().is_empty() {
            return Err(ClientError::config("sync.marker must not be empty"));
        }
        Ok(())
    }

    /// Validates and converts to the settings of one sync run.
    pub fn to_settings(&self) -> ClientResult<SyncSettings> {
        self.validate()?;
        Ok(SyncSettings::new(
            self.source_calendar_id.trim(),
            self.destination_calendar_id.trim(),
        )
        .with_marker(self.marker.trim())
        .with_past_days(self.past_days)
        .with_future_days(self.future_days)
        .with_exclusions(self.exclude_keywords.clone()))
    }
}

/// The `[logging]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: TracingOutputFormat,
}

impl LoggingSettings {
    /// Builds the tracing setup from config and command-line overrides.
    ///
    /// `--debug` wins over everything; JSON output gets the preset meant for
    /// scheduled runs.
    pub fn tracing_config(&self, debug: bool, format: Option<TracingOutputFormat>) -> TracingConfig {
        let format = format.unwrap_or(self.format);
        if debug {
            return TracingConfig::cli_debug().with_format(format);
        }
        match format {
            TracingOutputFormat::Json => TracingConfig::scheduled(),
            other => TracingConfig::default().with_format(other),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `path`, or from the default path when `None`.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// default configuration.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Parses a `config.toml` document.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calmirror")
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings (in config.toml, including credentials)
// ---------------------------------------------------------------------------

/// Google Calendar settings.
///
/// Credentials (`client_id`, `client_secret`) are stored inline and support
/// secret references (`pass::…`, `env::…`).
#[cfg(feature = "google")]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Account name, used for the default token file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Path to token storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,

    /// API request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to gateway configuration, resolving credential references.
    pub fn to_provider_config(&self) -> ClientResult<calmirror_providers::google::GoogleConfig> {
        use calmirror_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials
            .validate()
            .map_err(|e| ClientError::config(format!("invalid Google credentials: {}", e)))?;

        let mut config = GoogleConfig::new(credentials);

        if let Some(ref account) = self.account {
            config = config.with_account_name(account);
        }

        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }

        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(std::time::Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Resolves Google OAuth credentials from inline fields.
    ///
    /// Both `client_id` and `client_secret` must be set. Each value is passed
    /// through [`crate::secret::resolve`].
    pub(crate) fn resolve_credentials(
        &self,
    ) -> ClientResult<calmirror_providers::google::OAuthCredentials> {
        use calmirror_providers::google::OAuthCredentials;

        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            ClientError::config(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: calmirror auth google --credentials-file <path>",
                ClientConfig::default_path().display()
            ))
        })?;

        let raw_secret = self.client_secret.as_deref().ok_or_else(|| {
            ClientError::config("client_secret is missing from the [google] section")
        })?;

        Ok(OAuthCredentials::new(
            crate::secret::resolve(raw_id)?,
            crate::secret::resolve(raw_secret)?,
        ))
    }
}
