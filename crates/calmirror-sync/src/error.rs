//! Sync error types.

use std::fmt;

use calmirror_core::WindowError;
use calmirror_providers::ProviderError;
use thiserror::Error;

/// Result type for sync runs.
pub type SyncResult<T> = Result<T, SyncError>;

/// Which side of the mirror a calendar is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarRole {
    Source,
    Destination,
}

impl fmt::Display for CalendarRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

/// Errors that abort a sync run.
///
/// Per-event create/delete failures are not errors at this level; they are
/// recorded in the [`ReconcileReport`](crate::ReconcileReport).
#[derive(Debug, Error)]
pub enum SyncError {
    /// A configured calendar could not be resolved.
    #[error("{role} calendar '{id}' could not be resolved: {source}")]
    CalendarNotFound {
        role: CalendarRole,
        id: String,
        #[source]
        source: ProviderError,
    },

    /// Listing events of a calendar failed.
    #[error("failed to list {role} events: {source}")]
    Fetch {
        role: CalendarRole,
        #[source]
        source: ProviderError,
    },

    /// The configured day offsets do not produce a valid window.
    #[error("invalid sync window: {0}")]
    Window(#[from] WindowError),
}

impl SyncError {
    /// Creates a calendar resolution error.
    pub fn calendar_not_found(role: CalendarRole, id: impl Into<String>, source: ProviderError) -> Self {
        Self::CalendarNotFound {
            role,
            id: id.into(),
            source,
        }
    }

    /// Creates an event listing error.
    pub fn fetch(role: CalendarRole, source: ProviderError) -> Self {
        Self::Fetch { role, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_role() {
        let err = SyncError::calendar_not_found(
            CalendarRole::Destination,
            "abc@group.calendar.google.com",
            ProviderError::not_found("calendar not found"),
        );
        let message = err.to_string();
        assert!(message.starts_with("destination calendar 'abc@group.calendar.google.com'"));
        assert!(message.contains("not_found"));

        let err = SyncError::fetch(CalendarRole::Source, ProviderError::server("boom"));
        assert!(err.to_string().starts_with("failed to list source events"));
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error;
        let err = SyncError::fetch(CalendarRole::Source, ProviderError::network("timeout"));
        assert!(err.source().is_some());
    }
}
