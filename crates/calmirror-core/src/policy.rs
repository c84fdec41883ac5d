//! Exclusion policy for source events.
//!
//! An event is excluded from mirroring when any of three checks fires, in
//! this order:
//!
//! 1. the user's attendee status is `Declined` or `No`
//! 2. the event itself is `Canceled` (skipped when the provider cannot say)
//! 3. the event is all-day and its lowercased title contains a configured
//!    keyword
//!
//! Keyword matching is a plain substring test, so `"home"` also matches
//! `"homeopathy"`. Timed events are never excluded by keyword.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{AttendeeStatus, EventRecord, OverallStatus};

/// Keywords that exclude all-day events when found in their title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExclusionConfig {
    keywords: Vec<String>,
}

impl ExclusionConfig {
    /// Creates a config from keywords. Keywords are trimmed and lowercased;
    /// empty ones are dropped since they would match every title.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Returns the normalized keywords.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns the first keyword contained in `title`, if any.
    fn matching_keyword(&self, title: &str) -> Option<&str> {
        let title_lower = title.to_lowercase();
        self.keywords
            .iter()
            .find(|k| title_lower.contains(k.as_str()))
            .map(String::as_str)
    }
}

impl From<Vec<String>> for ExclusionConfig {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

impl From<ExclusionConfig> for Vec<String> {
    fn from(config: ExclusionConfig) -> Self {
        config.keywords
    }
}

/// Why an event was excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The user declined or answered no.
    AttendeeStatus(AttendeeStatus),
    /// The event was canceled.
    Canceled,
    /// An all-day event whose title contains this keyword.
    Keyword(String),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttendeeStatus(status) => write!(f, "attendee status is '{}'", status.as_str()),
            Self::Canceled => write!(f, "overall event status is 'canceled'"),
            Self::Keyword(keyword) => write!(f, "all-day title matches keyword '{}'", keyword),
        }
    }
}

/// Returns the first reason `event` should not be mirrored, or `None` when
/// it is eligible.
pub fn exclusion_reason(event: &EventRecord, config: &ExclusionConfig) -> Option<ExclusionReason> {
    if matches!(
        event.attendee_status,
        AttendeeStatus::Declined | AttendeeStatus::No
    ) {
        return Some(ExclusionReason::AttendeeStatus(event.attendee_status));
    }

    if event.overall_status == Some(OverallStatus::Canceled) {
        return Some(ExclusionReason::Canceled);
    }

    if event.is_all_day()
        && !event.title.is_empty()
        && let Some(keyword) = config.matching_keyword(&event.title)
    {
        return Some(ExclusionReason::Keyword(keyword.to_string()));
    }

    None
}

/// Returns true if `event` must not be mirrored.
pub fn is_excluded(event: &EventRecord, config: &ExclusionConfig) -> bool {
    exclusion_reason(event, config).is_some()
}
