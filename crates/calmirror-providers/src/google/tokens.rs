//! OAuth token persistence.
//!
//! Tokens live in a single JSON file written atomically (temp file + rename)
//! with 0600 permissions on Unix.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires (already reduced by a safety margin).
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the tokens were last obtained or refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a token set from an OAuth token response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(|secs| expiry(now, secs)),
            scopes,
            last_refresh: now,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if every scope in `required` was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh. The refresh token is kept.
    pub fn update_access_token(&mut self, access_token: impl Into<String>, expires_in_secs: Option<i64>) {
        let now = Utc::now();
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(|secs| expiry(now, secs));
        self.last_refresh = now;
    }
}

fn expiry(now: DateTime<Utc>, expires_in_secs: i64) -> DateTime<Utc> {
    now + Duration::seconds(expires_in_secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// File-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    /// Creates a token storage at the given path. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored tokens, or `None` when no token file exists.
    pub fn load(&self) -> ProviderResult<Option<TokenInfo>> {
        if !self.path.exists() {
            debug!("no token file at {}", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
        })?;

        let tokens = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("loaded tokens from {}", self.path.display());
        Ok(Some(tokens))
    }

    /// Writes `tokens` to disk, creating the parent directory if needed.
    pub fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::configuration(format!("failed to restrict token file: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!("saved tokens to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TokenInfo {
        TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            vec!["https://www.googleapis.com/auth/calendar".to_string()],
        )
    }

    #[test]
    fn token_info_creation() {
        let token = sample();
        assert_eq!(token.access_token, "access-token");
        assert_eq!(token.refresh_token, Some("refresh-token".to_string()));
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
    }

    #[test]
    fn token_expiry() {
        let mut token = sample();
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());

        // inside the safety margin
        let short = TokenInfo::new("access", None, Some(30), vec![]);
        assert!(short.is_expired());

        let forever = TokenInfo::new("access", None, None, vec![]);
        assert!(!forever.is_expired());
    }

    #[test]
    fn refresh_keeps_refresh_token() {
        let mut token = sample();
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        token.update_access_token("new-access", Some(3600));

        assert_eq!(token.access_token, "new-access");
        assert_eq!(token.refresh_token, Some("refresh-token".to_string()));
        assert!(!token.is_expired());
    }

    #[test]
    fn scope_check() {
        let token = sample();
        assert!(token.has_scopes(&["https://www.googleapis.com/auth/calendar".to_string()]));
        assert!(!token.has_scopes(&[
            "https://www.googleapis.com/auth/calendar.readonly".to_string()
        ]));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("nested").join("tokens.json"));

        storage.save(&sample()).unwrap();
        assert!(storage.path().exists());
        assert!(!storage.path().with_extension("json.tmp").exists());

        let loaded = TokenStorage::new(storage.path()).load().unwrap().unwrap();
        assert_eq!(loaded, sample_with_times(&loaded));
    }

    fn sample_with_times(loaded: &TokenInfo) -> TokenInfo {
        TokenInfo {
            expires_at: loaded.expires_at,
            last_refresh: loaded.last_refresh,
            ..sample()
        }
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("tokens.json"));
        storage.save(&sample()).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("tokens.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{not json").unwrap();

        let err = TokenStorage::new(&path).load().unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::ConfigurationError);
    }
}
