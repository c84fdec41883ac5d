//! In-memory calendar store.
//!
//! [`MemoryGateway`] keeps calendars and events in a map and implements
//! [`CalendarGateway`] without touching the network. Individual operations
//! can be made to fail so callers can observe how per-event and fatal errors
//! are handled.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use calmirror_core::{EventHandle, EventRecord, NewEvent, SyncWindow};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarGateway, CalendarHandle, CalendarInfo};

/// A mutation applied to the store, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOperation {
    Created(EventHandle),
    Deleted(EventHandle),
}

#[derive(Debug, Default)]
struct MemoryCalendar {
    name: String,
    is_primary: bool,
    events: BTreeMap<String, EventRecord>,
}

#[derive(Debug, Default)]
struct Failures {
    resolve: HashSet<String>,
    list: HashSet<String>,
    create_titles: HashSet<String>,
    delete_ids: HashSet<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    calendars: BTreeMap<String, MemoryCalendar>,
    operations: Vec<MemoryOperation>,
    failures: Failures,
    next_id: u64,
    report_overall_status: bool,
}

/// A [`CalendarGateway`] backed by process memory.
#[derive(Debug)]
pub struct MemoryGateway {
    name: String,
    state: Mutex<MemoryState>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// Creates an empty store that reports overall event status.
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            state: Mutex::new(MemoryState {
                report_overall_status: true,
                ..MemoryState::default()
            }),
        }
    }

    /// Builder method to add a calendar.
    pub fn with_calendar(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.add_calendar(id, name);
        self
    }

    /// Builder method to stop reporting overall status, as stores without
    /// that capability do. Listed events then carry `overall_status: None`.
    pub fn without_overall_status(self) -> Self {
        self.lock().report_overall_status = false;
        self
    }

    /// Adds (or renames) a calendar.
    pub fn add_calendar(&self, id: impl Into<String>, name: impl Into<String>) {
        let mut state = self.lock();
        let calendar = state.calendars.entry(id.into()).or_default();
        calendar.name = name.into();
    }

    /// Marks a calendar as the account's primary one.
    pub fn set_primary(&self, id: &str) {
        let mut state = self.lock();
        for (calendar_id, calendar) in state.calendars.iter_mut() {
            calendar.is_primary = calendar_id == id;
        }
    }

    /// Stores `event` under its handle, creating the calendar if needed.
    pub fn insert_event(&self, event: EventRecord) -> EventHandle {
        let handle = event.handle.clone();
        let mut state = self.lock();
        let calendar = state
            .calendars
            .entry(handle.calendar_id.clone())
            .or_insert_with(|| MemoryCalendar {
                name: handle.calendar_id.clone(),
                ..MemoryCalendar::default()
            });
        calendar.events.insert(handle.event_id.clone(), event);
        handle
    }

    /// Returns the events of a calendar ordered by start time.
    pub fn events(&self, calendar_id: &str) -> Vec<EventRecord> {
        let state = self.lock();
        let mut events: Vec<EventRecord> = state
            .calendars
            .get(calendar_id)
            .map(|c| c.events.values().cloned().collect())
            .unwrap_or_default();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
        events
    }

    /// Returns the titles of a calendar's events ordered by start time.
    pub fn titles(&self, calendar_id: &str) -> Vec<String> {
        self.events(calendar_id).into_iter().map(|e| e.title).collect()
    }

    /// Returns every successful mutation so far.
    pub fn operations(&self) -> Vec<MemoryOperation> {
        self.lock().operations.clone()
    }

    /// Makes resolution of `calendar_id` fail with a `NotFound` error.
    pub fn fail_resolve(&self, calendar_id: impl Into<String>) {
        self.lock().failures.resolve.insert(calendar_id.into());
    }

    /// Makes listing `calendar_id` fail with a server error.
    pub fn fail_list(&self, calendar_id: impl Into<String>) {
        self.lock().failures.list.insert(calendar_id.into());
    }

    /// Makes creating an event with exactly this title fail.
    pub fn fail_create(&self, title: impl Into<String>) {
        self.lock().failures.create_titles.insert(title.into());
    }

    /// Makes deleting the event with this id fail.
    pub fn fail_delete(&self, event_id: impl Into<String>) {
        self.lock().failures.delete_ids.insert(event_id.into());
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn error(&self, err: ProviderError) -> ProviderError {
        err.with_provider(&self.name)
    }

    fn resolve_sync(&self, id: &str) -> ProviderResult<CalendarHandle> {
        let state = self.lock();
        if state.failures.resolve.contains(id) {
            return Err(self.error(ProviderError::not_found(format!(
                "calendar '{}' not found",
                id
            ))));
        }
        state
            .calendars
            .get(id)
            .map(|c| CalendarHandle::new(id, c.name.clone()))
            .ok_or_else(|| {
                self.error(ProviderError::not_found(format!(
                    "calendar '{}' not found",
                    id
                )))
            })
    }

    fn list_sync(
        &self,
        calendar: &CalendarHandle,
        window: &SyncWindow,
    ) -> ProviderResult<Vec<EventRecord>> {
        let state = self.lock();
        if state.failures.list.contains(&calendar.id) {
            return Err(self.error(ProviderError::server(format!(
                "listing events of '{}' failed",
                calendar.id
            ))));
        }
        let stored = state.calendars.get(&calendar.id).ok_or_else(|| {
            self.error(ProviderError::not_found(format!(
                "calendar '{}' not found",
                calendar.id
            )))
        })?;

        let report_overall_status = state.report_overall_status;
        Ok(stored
            .events
            .values()
            .filter(|e| window.overlaps_event(&e.start, &e.end))
            .cloned()
            .map(|mut e| {
                if !report_overall_status {
                    e.overall_status = None;
                }
                e
            })
            .collect())
    }

    fn create_sync(
        &self,
        calendar: &CalendarHandle,
        event: &NewEvent,
        all_day: bool,
    ) -> ProviderResult<EventHandle> {
        if event.is_all_day() != all_day {
            return Err(self.error(ProviderError::bad_request(format!(
                "'{}': all-day flag does not match the creation call",
                event.title
            ))));
        }

        let mut state = self.lock();
        if state.failures.create_titles.contains(&event.title) {
            return Err(self.error(ProviderError::server(format!(
                "creating '{}' failed",
                event.title
            ))));
        }
        if !state.calendars.contains_key(&calendar.id) {
            return Err(self.error(ProviderError::not_found(format!(
                "calendar '{}' not found",
                calendar.id
            ))));
        }

        state.next_id += 1;
        let handle = EventHandle::new(&calendar.id, format!("mem-{}", state.next_id));
        let record = EventRecord::new(handle.clone(), event.start.clone(), event.end.clone())
            .with_title(&event.title)
            .with_description(&event.description);

        if let Some(stored) = state.calendars.get_mut(&calendar.id) {
            stored.events.insert(handle.event_id.clone(), record);
        }
        state
            .operations
            .push(MemoryOperation::Created(handle.clone()));
        Ok(handle)
    }

    fn delete_sync(&self, event: &EventHandle) -> ProviderResult<()> {
        let mut state = self.lock();
        if state.failures.delete_ids.contains(&event.event_id) {
            return Err(self.error(ProviderError::server(format!(
                "deleting '{}' failed",
                event.event_id
            ))));
        }
        // Already-gone events count as deleted.
        if let Some(calendar) = state.calendars.get_mut(&event.calendar_id) {
            calendar.events.remove(&event.event_id);
        }
        state.operations.push(MemoryOperation::Deleted(event.clone()));
        Ok(())
    }
}

impl CalendarGateway for MemoryGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_calendar<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarHandle>> {
        Box::pin(async move { self.resolve_sync(id) })
    }

    fn list_events<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        window: &'a SyncWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<EventRecord>>> {
        Box::pin(async move { self.list_sync(calendar, window) })
    }

    fn create_event<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<EventHandle>> {
        Box::pin(async move { self.create_sync(calendar, event, false) })
    }

    fn create_all_day_event<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<EventHandle>> {
        Box::pin(async move { self.create_sync(calendar, event, true) })
    }

    fn delete_event<'a>(&'a self, event: &'a EventHandle) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.delete_sync(event) })
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        let calendars: Vec<CalendarInfo> = self
            .lock()
            .calendars
            .iter()
            .map(|(id, c)| {
                CalendarInfo::new(id, c.name.clone())
                    .with_primary(c.is_primary)
                    .with_access_role("owner")
            })
            .collect();
        Box::pin(async move { Ok(calendars) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calmirror_core::{EventTime, OverallStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn window() -> SyncWindow {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        SyncWindow::compute(0, 7, &now).unwrap()
    }

    fn timed(calendar: &str, id: &str, title: &str, day: u32) -> EventRecord {
        EventRecord::new(
            EventHandle::new(calendar, id),
            EventTime::from_utc(Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap()),
            EventTime::from_utc(Utc.with_ymd_and_hms(2025, 3, day, 11, 0, 0).unwrap()),
        )
        .with_title(title)
        .with_overall_status(OverallStatus::Confirmed)
    }

    fn new_timed(title: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: String::new(),
            start: EventTime::from_utc(Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap()),
            end: EventTime::from_utc(Utc.with_ymd_and_hms(2025, 3, 11, 9, 30, 0).unwrap()),
        }
    }

    fn new_all_day(title: &str) -> NewEvent {
        let day = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        NewEvent {
            title: title.to_string(),
            description: String::new(),
            start: EventTime::from_date(day),
            end: EventTime::from_date(day.succ_opt().unwrap()),
        }
    }

    #[tokio::test]
    async fn resolve_known_and_unknown_calendars() {
        let gateway = MemoryGateway::new().with_calendar("dst", "Mirror");

        let handle = gateway.resolve_calendar("dst").await.unwrap();
        assert_eq!(handle, CalendarHandle::new("dst", "Mirror"));

        let err = gateway.resolve_calendar("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.provider(), Some("memory"));
    }

    #[tokio::test]
    async fn list_filters_by_window() {
        let gateway = MemoryGateway::new().with_calendar("src", "Source");
        gateway.insert_event(timed("src", "in", "Inside", 12));
        gateway.insert_event(timed("src", "before", "Before", 1));
        gateway.insert_event(timed("src", "after", "After", 30));

        let handle = gateway.resolve_calendar("src").await.unwrap();
        let events = gateway.list_events(&handle, &window()).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Inside");
    }

    #[tokio::test]
    async fn list_without_overall_status_capability() {
        let gateway = MemoryGateway::new()
            .with_calendar("src", "Source")
            .without_overall_status();
        gateway.insert_event(timed("src", "e1", "Inside", 12));

        let handle = gateway.resolve_calendar("src").await.unwrap();
        let events = gateway.list_events(&handle, &window()).await.unwrap();
        assert_eq!(events[0].overall_status, None);
    }

    #[tokio::test]
    async fn create_and_delete_are_recorded() {
        let gateway = MemoryGateway::new().with_calendar("dst", "Mirror");
        let handle = gateway.resolve_calendar("dst").await.unwrap();

        let timed = gateway.create_event(&handle, &new_timed("A")).await.unwrap();
        let all_day = gateway
            .create_all_day_event(&handle, &new_all_day("B"))
            .await
            .unwrap();
        assert_ne!(timed, all_day);
        assert_eq!(gateway.titles("dst"), ["A", "B"]);

        gateway.delete_event(&timed).await.unwrap();
        assert_eq!(gateway.titles("dst"), ["B"]);

        assert_eq!(
            gateway.operations(),
            [
                MemoryOperation::Created(timed.clone()),
                MemoryOperation::Created(all_day),
                MemoryOperation::Deleted(timed),
            ]
        );
    }

    #[tokio::test]
    async fn creation_call_must_match_all_day_flag() {
        let gateway = MemoryGateway::new().with_calendar("dst", "Mirror");
        let handle = gateway.resolve_calendar("dst").await.unwrap();

        assert!(gateway.create_event(&handle, &new_all_day("X")).await.is_err());
        assert!(
            gateway
                .create_all_day_event(&handle, &new_timed("Y"))
                .await
                .is_err()
        );
        assert!(gateway.events("dst").is_empty());
    }

    #[tokio::test]
    async fn deleting_missing_event_succeeds() {
        let gateway = MemoryGateway::new().with_calendar("dst", "Mirror");
        gateway
            .delete_event(&EventHandle::new("dst", "gone"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn injected_failures() {
        let gateway = MemoryGateway::new()
            .with_calendar("src", "Source")
            .with_calendar("dst", "Mirror");
        gateway.insert_event(timed("dst", "keep", "Keep", 12));
        gateway.fail_resolve("src");
        gateway.fail_create("Broken");
        gateway.fail_delete("keep");

        assert!(gateway.resolve_calendar("src").await.unwrap_err().is_not_found());

        let dst = gateway.resolve_calendar("dst").await.unwrap();
        let err = gateway
            .create_event(&dst, &new_timed("Broken"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        assert!(
            gateway
                .delete_event(&EventHandle::new("dst", "keep"))
                .await
                .is_err()
        );
        assert_eq!(gateway.titles("dst"), ["Keep"]);

        gateway.fail_list("dst");
        assert!(gateway.list_events(&dst, &window()).await.is_err());
        assert!(gateway.operations().is_empty());
    }

    #[tokio::test]
    async fn list_calendars_reports_primary() {
        let gateway = MemoryGateway::new()
            .with_calendar("a@example.com", "Personal")
            .with_calendar("b@example.com", "Mirror");
        gateway.set_primary("a@example.com");

        let calendars = gateway.list_calendars().await.unwrap();
        assert_eq!(calendars.len(), 2);
        assert!(calendars[0].is_primary);
        assert!(!calendars[1].is_primary);
        assert!(calendars.iter().all(CalendarInfo::is_writable));
    }
}
