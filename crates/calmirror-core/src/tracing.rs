//! Tracing setup for calmirror
//!
//! Every run writes its log through `tracing`; the subscriber chosen here
//! decides whether that log is human-readable or JSON lines for a scheduler
//! to collect. Logs always go to stderr so stdout only carries command
//! output.
//!
//! # Usage
//!
//! ```ignore
//! use calmirror_core::tracing::{init_tracing, TracingConfig};
//!
//! // Interactive use
//! init_tracing(TracingConfig::default())?;
//!
//! // Cron / systemd timer
//! init_tracing(TracingConfig::scheduled())?;
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    prelude::*,
    registry::LookupSpan,
};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingOutputFormat {
    /// Multi-line, for reading a single run
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// JSON lines, for log collectors
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format '{}' (expected pretty, compact or json)",
                other
            )),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for calmirror's own targets when neither `env_filter` nor
    /// `RUST_LOG` is set
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Include file and line of each event
    pub include_location: bool,
    /// Include the module path of each event
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Log span open/close, which records how long `sync`, `cleanup` and
    /// `create` took
    pub include_span_events: bool,
    /// Filter directive that overrides `default_level` and `RUST_LOG`
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: true,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Preset for `--debug`: debug level, source locations, no timestamps.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
            include_timestamp: false,
            ..Self::default()
        }
    }

    /// Preset for unattended runs started by a scheduler.
    #[must_use]
    pub fn scheduled() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            include_target: true,
            include_span_events: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Returns the filter directive used when neither `env_filter` nor
    /// `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("calmirror={}", self.default_level)
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Builds the formatting layer for the configured output format.
    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(self.include_target)
            .with_span_events(self.span_events());

        match (self.output_format, self.include_timestamp) {
            (TracingOutputFormat::Json, _) => base.json().boxed(),
            (TracingOutputFormat::Pretty, true) => base.pretty().boxed(),
            (TracingOutputFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (TracingOutputFormat::Compact, true) => base.compact().boxed(),
            (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        }
    }
}

/// Installs the global subscriber. Call once, at process start.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set or if
/// the env filter directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.filter()?)
        .with(config.fmt_layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
