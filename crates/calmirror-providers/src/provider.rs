//! CalendarGateway trait definition.
//!
//! This module defines the [`CalendarGateway`] trait, the seam between the
//! reconciler and a remote calendar store (Google Calendar, or the in-memory
//! store used by tests).
//!
//! Gateways are responsible for:
//! - Resolving configured calendar ids into handles
//! - Listing expanded event instances that overlap a window
//! - Creating timed and all-day events, and deleting events
//! - Mapping the store's raw statuses onto [`AttendeeStatus`] / [`OverallStatus`]
//!
//! [`AttendeeStatus`]: calmirror_core::AttendeeStatus
//! [`OverallStatus`]: calmirror_core::OverallStatus

use std::future::Future;
use std::pin::Pin;

use calmirror_core::{EventHandle, EventRecord, NewEvent, SyncWindow};

use crate::error::ProviderResult;

/// A calendar that has been resolved against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarHandle {
    /// The store's calendar identifier.
    pub id: String,
    /// Human-readable name, used for logging.
    pub name: String,
}

impl CalendarHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Information about a calendar visible to the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    /// Unique identifier for the calendar.
    pub id: String,
    /// Human-readable name of the calendar.
    pub name: String,
    /// Whether this is the primary calendar.
    pub is_primary: bool,
    /// The access role of the account on this calendar (e.g. "owner", "reader").
    pub access_role: Option<String>,
}

impl CalendarInfo {
    /// Creates a new CalendarInfo with the given ID and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_primary: false,
            access_role: None,
        }
    }

    /// Builder method to mark as primary.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Builder method to set the access role.
    pub fn with_access_role(mut self, role: impl Into<String>) -> Self {
        self.access_role = Some(role.into());
        self
    }

    /// Returns true if events can be created in this calendar.
    pub fn is_writable(&self) -> bool {
        matches!(self.access_role.as_deref(), Some("owner" | "writer"))
    }
}

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the reconciler can take a
/// `&dyn CalendarGateway`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The operations the reconciler needs from a calendar store.
///
/// # Implementation Notes
///
/// - `list_events` returns every instance overlapping the window, with
///   recurring series already expanded; no ordering is promised
/// - `create_event` is only called with timed payloads and
///   `create_all_day_event` only with all-day payloads
/// - `delete_event` should treat an event that is already gone as success
pub trait CalendarGateway: Send + Sync {
    /// Returns the name of this gateway (e.g., "google:default", "memory").
    fn name(&self) -> &str;

    /// Resolves a calendar id into a handle.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the calendar does not exist or is not
    /// visible to the account.
    fn resolve_calendar<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarHandle>>;

    /// Lists event instances in `calendar` that overlap `window`.
    fn list_events<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        window: &'a SyncWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<EventRecord>>>;

    /// Creates a timed event.
    fn create_event<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<EventHandle>>;

    /// Creates an all-day event.
    fn create_all_day_event<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<EventHandle>>;

    /// Deletes an event.
    fn delete_event<'a>(&'a self, event: &'a EventHandle) -> BoxFuture<'a, ProviderResult<()>>;

    /// Lists calendars visible to the account.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>>;
}
