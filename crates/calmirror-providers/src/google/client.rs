//! Google Calendar API client.
//!
//! Low-level HTTP calls against Calendar API v3: paginated `events.list`,
//! `calendarList.get`/`list`, `events.insert` and `events.delete`, plus the
//! conversion of API events into [`EventRecord`]s.

use std::time::Duration;

use calmirror_core::{
    AttendeeStatus, EventHandle, EventRecord, EventTime, NewEvent, OverallStatus,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Page size requested from `events.list` (the API maximum is 2500).
const EVENTS_PAGE_SIZE: u32 = 250;

/// Google Calendar API client. Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a new Google Calendar client with the given access token.
    pub fn new(
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Lists every event instance of `calendar_id` overlapping
    /// `[time_min, time_max]`, following `nextPageToken` until exhausted.
    ///
    /// Recurring series are expanded server-side (`singleEvents=true`).
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> ProviderResult<Vec<EventRecord>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(calendar_id, time_min, time_max, page_token.as_deref())
                .await?;

            all_events.extend(
                page.items
                    .into_iter()
                    .filter_map(|event| convert_event(event, calendar_id)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} events from calendar {}", all_events.len(), calendar_id);
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!("{}/events", calendar_url(calendar_id));

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", format_datetime(time_min)),
                ("timeMax", format_datetime(time_max)),
                ("singleEvents", "true".to_string()),
                ("maxResults", EVENTS_PAGE_SIZE.to_string()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(request_error)?;
        let response = check_status(response, &format!("calendar '{}'", calendar_id)).await?;
        parse_body(response).await
    }

    /// Looks up one calendar in the user's calendar list.
    ///
    /// A calendar the account cannot see yields a `NotFound` error.
    pub async fn get_calendar(&self, calendar_id: &str) -> ProviderResult<CalendarListEntry> {
        let url = format!(
            "{}/users/me/calendarList/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, &format!("calendar '{}'", calendar_id)).await?;
        parse_body(response).await
    }

    /// Lists available calendars.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url).bearer_auth(&self.access_token);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await.map_err(request_error)?;
            let response = check_status(response, "calendar list").await?;
            let list: CalendarListResponse = parse_body(response).await?;

            calendars.extend(list.items);
            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }

    /// Inserts an event and returns the id Google assigned to it.
    pub async fn insert_event(&self, calendar_id: &str, event: &NewEvent) -> ProviderResult<String> {
        let url = format!("{}/events", calendar_url(calendar_id));
        let body = InsertEventBody::from(event);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, &format!("calendar '{}'", calendar_id)).await?;
        let created: InsertedEvent = parse_body(response).await?;
        Ok(created.id)
    }

    /// Deletes an event. An event that is already gone (404/410) counts as
    /// deleted.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let url = format!(
            "{}/events/{}",
            calendar_url(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            debug!("event {} already deleted ({})", event_id, status);
            return Ok(());
        }

        check_status(response, &format!("event '{}'", event_id)).await?;
        Ok(())
    }
}

fn calendar_url(calendar_id: &str) -> String {
    format!(
        "{}/calendars/{}",
        CALENDAR_API_BASE,
        urlencoding::encode(calendar_id)
    )
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn request_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("request timeout")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// Passes successful responses through and turns everything else into a
/// classified [`ProviderError`]. `subject` names what was addressed, for
/// not-found messages.
async fn check_status(
    response: reqwest::Response,
    subject: &str,
) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    Err(status_error(status, subject, &body, retry_after))
}

fn status_error(
    status: reqwest::StatusCode,
    subject: &str,
    body: &str,
    retry_after: Option<u64>,
) -> ProviderError {
    let code = ProviderErrorCode::from_http_status(status.as_u16());
    let message = match code {
        ProviderErrorCode::AuthenticationFailed => "access token expired or invalid".to_string(),
        ProviderErrorCode::AuthorizationFailed => format!("access denied to {}", subject),
        ProviderErrorCode::NotFound => format!("{} not found", subject),
        ProviderErrorCode::RateLimited => match retry_after {
            Some(secs) => format!("rate limit exceeded, retry after {} seconds", secs),
            None => "rate limit exceeded".to_string(),
        },
        _ => format!("API error ({}): {}", status, body),
    };
    ProviderError::new(code, message)
}

async fn parse_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> ProviderResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

/// Converts a Google Calendar API event to an [`EventRecord`].
///
/// Events without an id or with unparseable times are skipped with a
/// warning. Cancelled instances are kept; excluding them is up to the
/// caller's policy.
fn convert_event(event: ApiEvent, calendar_id: &str) -> Option<EventRecord> {
    let Some(id) = event.id.clone() else {
        warn!("skipping event without id in calendar {}", calendar_id);
        return None;
    };

    let start = parse_event_time(&event.start)
        .map_err(|e| warn!("event {}: invalid start: {}", id, e))
        .ok()?;
    let end = parse_event_time(&event.end)
        .map_err(|e| warn!("event {}: invalid end: {}", id, e))
        .ok()?;

    let attendee_status = own_attendee_status(&event);
    let overall_status = OverallStatus::parse(event.status.as_deref());

    Some(
        EventRecord::new(EventHandle::new(calendar_id, id), start, end)
            .with_title(event.summary.unwrap_or_default())
            .with_description(event.description.unwrap_or_default())
            .with_attendee_status(attendee_status)
            .with_overall_status(overall_status),
    )
}

fn parse_event_time(time: &ApiEventTime) -> Result<EventTime, String> {
    match (&time.date_time, &time.date) {
        (Some(dt), _) => DateTime::parse_from_rfc3339(dt)
            .map(|parsed| EventTime::from_utc(parsed.with_timezone(&Utc)))
            .map_err(|e| format!("'{}': {}", dt, e)),
        (None, Some(date)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(EventTime::from_date)
            .map_err(|e| format!("'{}': {}", date, e)),
        (None, None) => Err("neither dateTime nor date is set".to_string()),
    }
}

/// The authenticated user's status: `Owner` when they organize the event,
/// otherwise the response of the attendee entry flagged `self`.
fn own_attendee_status(event: &ApiEvent) -> AttendeeStatus {
    if event.organizer.as_ref().and_then(|o| o.is_self) == Some(true) {
        return AttendeeStatus::Owner;
    }

    let me = event
        .attendees
        .iter()
        .flatten()
        .find(|a| a.is_self == Some(true));

    match me {
        Some(a) if a.organizer == Some(true) => AttendeeStatus::Owner,
        Some(a) => AttendeeStatus::parse(a.response_status.as_deref()),
        None => AttendeeStatus::Unknown,
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    status: Option<String>,
    organizer: Option<ApiPerson>,
    attendees: Option<Vec<ApiAttendee>>,
}

/// Event time, as read from and sent to the API.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl From<&EventTime> for ApiEventTime {
    fn from(time: &EventTime) -> Self {
        match time {
            EventTime::AllDay(date) => Self {
                date: Some(date.format("%Y-%m-%d").to_string()),
                ..Self::default()
            },
            EventTime::DateTime(dt) => Self {
                date_time: Some(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ..Self::default()
            },
        }
    }
}

/// Organizer from the API.
#[derive(Debug, Deserialize)]
struct ApiPerson {
    #[serde(rename = "self")]
    is_self: Option<bool>,
}

/// Attendee from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    #[serde(rename = "self")]
    is_self: Option<bool>,
    organizer: Option<bool>,
    response_status: Option<String>,
}

/// Body of an events.insert request. The id is left out so Google assigns
/// one.
#[derive(Debug, Serialize)]
struct InsertEventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: ApiEventTime,
    end: ApiEventTime,
}

impl<'a> From<&'a NewEvent> for InsertEventBody<'a> {
    fn from(event: &'a NewEvent) -> Self {
        Self {
            summary: &event.title,
            description: &event.description,
            start: ApiEventTime::from(&event.start),
            end: ApiEventTime::from(&event.end),
        }
    }
}

/// The part of an events.insert response we keep.
#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// A calendar from the calendar list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The calendar ID.
    pub id: String,
    /// The calendar summary (name).
    #[serde(default)]
    pub summary: String,
    /// The name the user gave the calendar, if they renamed it.
    pub summary_override: Option<String>,
    /// Whether this is the primary calendar.
    #[serde(default)]
    pub primary: bool,
    /// The user's access role ("owner", "writer", "reader", ...).
    pub access_role: Option<String>,
}

impl CalendarListEntry {
    /// Returns the name shown to the user.
    pub fn display_name(&self) -> &str {
        self.summary_override.as_deref().unwrap_or(&self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_event(json: &str) -> EventRecord {
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        convert_event(event, "source@example.com").unwrap()
    }

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "summary": "Test Meeting",
                    "start": { "dateTime": "2024-03-15T10:00:00Z" },
                    "end": { "dateTime": "2024-03-15T11:00:00Z" },
                    "status": "confirmed"
                }
            ],
            "nextPageToken": "page-2"
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].summary, Some("Test Meeting".to_string()));
        assert_eq!(response.next_page_token, Some("page-2".to_string()));
    }

    #[test]
    fn convert_timed_event() {
        let record = parse_event(
            r#"{
                "id": "event1",
                "summary": "Team Sync",
                "description": "Agenda: roadmap",
                "start": { "dateTime": "2024-03-15T10:00:00+01:00", "timeZone": "Europe/Paris" },
                "end": { "dateTime": "2024-03-15T11:00:00+01:00", "timeZone": "Europe/Paris" },
                "status": "confirmed",
                "attendees": [
                    { "email": "boss@example.com", "organizer": true, "responseStatus": "accepted" },
                    { "email": "me@example.com", "self": true, "responseStatus": "accepted" }
                ]
            }"#,
        );

        assert_eq!(record.handle, EventHandle::new("source@example.com", "event1"));
        assert_eq!(record.title, "Team Sync");
        assert_eq!(record.description, "Agenda: roadmap");
        assert!(!record.is_all_day());
        assert_eq!(
            record.start.as_datetime().unwrap().to_rfc3339(),
            "2024-03-15T09:00:00+00:00"
        );
        assert_eq!(record.attendee_status, AttendeeStatus::Yes);
        assert_eq!(record.overall_status, Some(OverallStatus::Confirmed));
    }

    #[test]
    fn convert_all_day_event() {
        let record = parse_event(
            r#"{
                "id": "event2",
                "summary": "Working From Home",
                "start": { "date": "2024-03-15" },
                "end": { "date": "2024-03-16" }
            }"#,
        );

        assert!(record.is_all_day());
        assert_eq!(
            record.start.as_date(),
            NaiveDate::from_ymd_opt(2024, 3, 15).as_ref()
        );
        assert_eq!(record.description, "");
        assert_eq!(record.attendee_status, AttendeeStatus::Unknown);
        assert_eq!(record.overall_status, Some(OverallStatus::Unknown));
    }

    #[test]
    fn self_declined_attendee() {
        let record = parse_event(
            r#"{
                "id": "event3",
                "summary": "Optional Talk",
                "start": { "dateTime": "2024-03-15T10:00:00Z" },
                "end": { "dateTime": "2024-03-15T11:00:00Z" },
                "attendees": [
                    { "email": "me@example.com", "self": true, "responseStatus": "declined" }
                ]
            }"#,
        );
        assert_eq!(record.attendee_status, AttendeeStatus::Declined);
    }

    #[test]
    fn organizer_self_is_owner() {
        let record = parse_event(
            r#"{
                "id": "event4",
                "summary": "Focus",
                "start": { "dateTime": "2024-03-15T10:00:00Z" },
                "end": { "dateTime": "2024-03-15T11:00:00Z" },
                "organizer": { "email": "me@example.com", "self": true }
            }"#,
        );
        assert_eq!(record.attendee_status, AttendeeStatus::Owner);
    }

    #[test]
    fn cancelled_event_is_kept_with_status() {
        let record = parse_event(
            r#"{
                "id": "event5",
                "summary": "Called off",
                "status": "cancelled",
                "start": { "dateTime": "2024-03-15T10:00:00Z" },
                "end": { "dateTime": "2024-03-15T11:00:00Z" }
            }"#,
        );
        assert_eq!(record.overall_status, Some(OverallStatus::Canceled));
    }

    #[test]
    fn page_with_timeless_event_still_parses() {
        let json = r#"{
            "items": [
                { "id": "broken", "summary": "No times", "status": "confirmed" },
                {
                    "id": "ok",
                    "summary": "Standup",
                    "start": { "dateTime": "2024-03-15T09:00:00Z" },
                    "end": { "dateTime": "2024-03-15T09:15:00Z" }
                }
            ]
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        let records: Vec<EventRecord> = response
            .items
            .into_iter()
            .filter_map(|event| convert_event(event, "cal"))
            .collect();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Standup");
    }

    #[test]
    fn events_without_id_or_time_are_skipped() {
        let no_id: ApiEvent = serde_json::from_str(
            r#"{ "start": { "date": "2024-03-15" }, "end": { "date": "2024-03-16" } }"#,
        )
        .unwrap();
        assert!(convert_event(no_id, "cal").is_none());

        let bad_time: ApiEvent = serde_json::from_str(
            r#"{ "id": "x", "start": { "dateTime": "yesterday" }, "end": {} }"#,
        )
        .unwrap();
        assert!(convert_event(bad_time, "cal").is_none());
    }

    #[test]
    fn insert_body_for_timed_event() {
        let event = NewEvent {
            title: "Team Sync [Synced]".to_string(),
            description: "Agenda".to_string(),
            start: EventTime::from_utc(DateTime::parse_from_rfc3339("2024-03-15T10:00:00Z").unwrap().to_utc()),
            end: EventTime::from_utc(DateTime::parse_from_rfc3339("2024-03-15T11:00:00Z").unwrap().to_utc()),
        };

        let body = serde_json::to_value(InsertEventBody::from(&event)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "summary": "Team Sync [Synced]",
                "description": "Agenda",
                "start": { "dateTime": "2024-03-15T10:00:00Z" },
                "end": { "dateTime": "2024-03-15T11:00:00Z" }
            })
        );
    }

    #[test]
    fn insert_body_for_all_day_event() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let event = NewEvent {
            title: "Offsite [Synced]".to_string(),
            description: String::new(),
            start: EventTime::from_date(day),
            end: EventTime::from_date(day.succ_opt().unwrap()),
        };

        let body = serde_json::to_value(InsertEventBody::from(&event)).unwrap();
        assert_eq!(body["start"], serde_json::json!({ "date": "2024-03-15" }));
        assert_eq!(body["end"], serde_json::json!({ "date": "2024-03-16" }));
    }

    #[test]
    fn status_mapping() {
        use reqwest::StatusCode;

        let code = |status| status_error(status, "calendar 'x'", "", None).code();
        assert_eq!(code(StatusCode::UNAUTHORIZED), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(code(StatusCode::FORBIDDEN), ProviderErrorCode::AuthorizationFailed);
        assert_eq!(code(StatusCode::NOT_FOUND), ProviderErrorCode::NotFound);
        assert_eq!(code(StatusCode::TOO_MANY_REQUESTS), ProviderErrorCode::RateLimited);
        assert_eq!(code(StatusCode::BAD_REQUEST), ProviderErrorCode::BadRequest);
        assert_eq!(code(StatusCode::BAD_GATEWAY), ProviderErrorCode::ServerError);

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "x", "", Some(30));
        assert!(err.message().contains("retry after 30 seconds"));
    }

    #[test]
    fn parse_calendar_list() {
        let json = r#"{
            "items": [
                {
                    "id": "me@example.com",
                    "summary": "me@example.com",
                    "summaryOverride": "Personal",
                    "primary": true,
                    "accessRole": "owner"
                },
                {
                    "id": "abc@group.calendar.google.com",
                    "summary": "Work Mirror",
                    "accessRole": "writer"
                }
            ]
        }"#;

        let response: CalendarListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 2);
        assert!(response.items[0].primary);
        assert_eq!(response.items[0].display_name(), "Personal");
        assert!(!response.items[1].primary);
        assert_eq!(response.items[1].display_name(), "Work Mirror");
        assert!(response.next_page_token.is_none());
    }
}
