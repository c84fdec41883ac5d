//! Error types for calendar gateway operations.
//!
//! Every failure a gateway can report (a calendar that cannot be resolved,
//! a rejected create, an expired token) is a [`ProviderError`] carrying a
//! [`ProviderErrorCode`] so callers can classify it without string matching.

use std::fmt;
use thiserror::Error;

macro_rules! error_codes {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, $ctor:ident; )+) => {
        /// The category of a provider error.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ProviderErrorCode {
            $( $(#[$doc])* $variant, )+
        }

        impl ProviderErrorCode {
            /// Returns the snake_case name used in messages and logs.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )+
                }
            }
        }

        impl ProviderError {
            $(
                #[doc = concat!("Creates a `", $name, "` error.")]
                pub fn $ctor(message: impl Into<String>) -> Self {
                    Self::new(ProviderErrorCode::$variant, message)
                }
            )+
        }
    };
}

error_codes! {
    /// Credentials are missing, invalid or expired.
    AuthenticationFailed => "authentication_failed", authentication;
    /// The account may not access the calendar.
    AuthorizationFailed => "authorization_failed", authorization;
    /// Connection, DNS or timeout failure.
    NetworkError => "network_error", network;
    /// Too many requests.
    RateLimited => "rate_limited", rate_limited;
    /// The store failed on its side (5xx).
    ServerError => "server_error", server;
    /// A response could not be parsed.
    InvalidResponse => "invalid_response", invalid_response;
    /// Calendar or event does not exist.
    NotFound => "not_found", not_found;
    /// The store rejected the request, e.g. malformed event data.
    BadRequest => "bad_request", bad_request;
    /// Missing or invalid local configuration.
    ConfigurationError => "configuration_error", configuration;
    /// Unexpected local state.
    InternalError => "internal_error", internal;
}

impl ProviderErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Classifies an HTTP error status.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::AuthenticationFailed,
            403 => Self::AuthorizationFailed,
            404 | 410 => Self::NotFound,
            429 => Self::RateLimited,
            400 | 409 | 412 | 422 => Self::BadRequest,
            _ => Self::ServerError,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error that occurred while talking to a calendar store.
#[derive(Debug, Error)]
#[error("{}{code}: {message}", provider_prefix(.provider))]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The gateway that produced this error (e.g. "google:default").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn provider_prefix(provider: &Option<String>) -> String {
    provider
        .as_deref()
        .map(|p| format!("[{}] ", p))
        .unwrap_or_default()
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Tags the error with the gateway that produced it. An existing tag
    /// is kept.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        if self.provider.is_none() {
            self.provider = Some(provider.into());
        }
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Returns true if the calendar or event does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code == ProviderErrorCode::NotFound
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
