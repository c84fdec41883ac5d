//! Event types for calendar events.
//!
//! This module provides core types for representing calendar events:
//! - [`EventRecord`]: A read-only, provider-agnostic view of one event instance
//! - [`AttendeeStatus`] / [`OverallStatus`]: Closed status enumerations
//! - [`EventHandle`]: The provider address of an event, used for deletion
//! - [`NewEvent`]: The payload for creating a mirrored event

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// The authenticated user's own response to an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeStatus {
    /// The user owns (organizes) the event.
    Owner,
    /// The user accepted.
    Yes,
    /// The user tentatively accepted.
    Maybe,
    /// The user answered no.
    No,
    /// The user declined.
    Declined,
    /// The user was invited and has not answered.
    Invited,
    /// Missing or unrecognized status.
    #[default]
    Unknown,
}

impl AttendeeStatus {
    /// Parses a raw provider status.
    ///
    /// The value is trimmed and lowercased first. Both the short forms
    /// (`YES`, `MAYBE`, `NO`, `INVITED`) and the Google/iCalendar spellings
    /// (`accepted`, `tentative`, `declined`, `needsAction`) are recognized.
    /// Anything else, including `None`, is [`AttendeeStatus::Unknown`].
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unknown;
        };
        match raw.trim().to_lowercase().as_str() {
            "owner" => Self::Owner,
            "yes" | "accepted" => Self::Yes,
            "maybe" | "tentative" => Self::Maybe,
            "no" => Self::No,
            "declined" => Self::Declined,
            "invited" | "needsaction" | "needs-action" | "needs_action" => Self::Invited,
            _ => Self::Unknown,
        }
    }

    /// Returns a lowercase name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Yes => "yes",
            Self::Maybe => "maybe",
            Self::No => "no",
            Self::Declined => "declined",
            Self::Invited => "invited",
            Self::Unknown => "unknown",
        }
    }
}

/// The status of the event itself, independent of any attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Confirmed,
    Tentative,
    Canceled,
    #[default]
    Unknown,
}

impl OverallStatus {
    /// Parses a raw provider status (trimmed, case-insensitive).
    ///
    /// Both `canceled` and Google's `cancelled` spelling map to
    /// [`OverallStatus::Canceled`].
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unknown;
        };
        match raw.trim().to_lowercase().as_str() {
            "confirmed" => Self::Confirmed,
            "tentative" => Self::Tentative,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    /// Returns a lowercase name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Tentative => "tentative",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

/// Where an event lives in its provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventHandle {
    /// The calendar holding the event.
    pub calendar_id: String,
    /// The provider's event (instance) identifier.
    pub event_id: String,
}

impl EventHandle {
    /// Creates a new event handle.
    pub fn new(calendar_id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            event_id: event_id.into(),
        }
    }
}

/// A read-only view of a single event instance as reported by a provider.
///
/// Recurring series arrive already expanded: each record is one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Provider address of this instance.
    pub handle: EventHandle,
    /// The event title (empty when the event has none).
    pub title: String,
    /// The event description (empty when the event has none).
    pub description: String,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// The authenticated user's response.
    pub attendee_status: AttendeeStatus,
    /// The event's own status, or `None` when the provider cannot report one.
    pub overall_status: Option<OverallStatus>,
}

impl EventRecord {
    /// Creates a new event record with empty title/description and
    /// unknown statuses.
    pub fn new(handle: EventHandle, start: EventTime, end: EventTime) -> Self {
        Self {
            handle,
            title: String::new(),
            description: String::new(),
            start,
            end,
            attendee_status: AttendeeStatus::Unknown,
            overall_status: None,
        }
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns true if the title contains `marker` as a substring.
    pub fn has_marker(&self, marker: &str) -> bool {
        self.title.contains(marker)
    }

    /// Builder method to set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the attendee status.
    pub fn with_attendee_status(mut self, status: AttendeeStatus) -> Self {
        self.attendee_status = status;
        self
    }

    /// Builder method to set the overall status.
    pub fn with_overall_status(mut self, status: OverallStatus) -> Self {
        self.overall_status = Some(status);
        self
    }
}

/// The payload for creating an event in a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
}

impl NewEvent {
    /// Builds the mirrored copy of `source`: title suffixed with
    /// `" " + marker`, identical times, description copied verbatim.
    /// Nothing else is carried over.
    pub fn mirror_of(source: &EventRecord, marker: &str) -> Self {
        Self {
            title: format!("{} {}", source.title, marker),
            description: source.description.clone(),
            start: source.start.clone(),
            end: source.end.clone(),
        }
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }
}
