//! Time types for calendar events and sync windows.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a specific datetime or an all-day date), and
//! [`SyncWindow`], the closed range a single sync run operates over.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (with timezone, stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Returns the date if this is an `AllDay` variant.
    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            Self::AllDay(d) => Some(d),
            Self::DateTime(_) => None,
        }
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// Errors raised while computing a [`SyncWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The day offset moves past the range chrono can represent.
    #[error("day offset {days} is out of range from {date}")]
    OutOfRange { date: NaiveDate, days: u32 },

    /// No local instant exists for the requested wall-clock time.
    #[error("no local time exists for {0}")]
    NonexistentLocalTime(NaiveDateTime),
}

/// The closed range `[start, end]` a sync run cleans up and fetches over.
///
/// Both bounds sit on local calendar-day boundaries: `start` is local
/// midnight of the first day and `end` is 23:59:59.999 local time on the
/// last day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (inclusive).
    pub end: DateTime<Utc>,
    /// First local calendar day covered by the window.
    pub first_day: NaiveDate,
    /// Last local calendar day covered by the window.
    pub last_day: NaiveDate,
}

impl SyncWindow {
    /// Computes the window from day offsets relative to `now`.
    ///
    /// Day arithmetic happens on local calendar dates in `now`'s timezone,
    /// so the bounds stay on midnight / end-of-day across DST transitions.
    /// `now` is injected so the result is a pure function of its inputs.
    pub fn compute<Tz: TimeZone>(
        past_days: u32,
        future_days: u32,
        now: &DateTime<Tz>,
    ) -> Result<Self, WindowError> {
        let tz = now.timezone();
        let today = now.date_naive();

        let first_day = today
            .checked_sub_days(Days::new(u64::from(past_days)))
            .ok_or(WindowError::OutOfRange {
                date: today,
                days: past_days,
            })?;
        let last_day = today
            .checked_add_days(Days::new(u64::from(future_days)))
            .ok_or(WindowError::OutOfRange {
                date: today,
                days: future_days,
            })?;

        let start = start_of_day(&tz, first_day)?;
        let end = end_of_day(&tz, last_day)?;

        Ok(Self {
            start,
            end,
            first_day,
            last_day,
        })
    }

    /// Checks if an event with the given start and end overlaps this window.
    ///
    /// An event overlaps if it starts no later than the window end and ends
    /// after the window start. All-day events carry no timezone, so they are
    /// compared by local calendar date (their end date is exclusive).
    pub fn overlaps_event(&self, event_start: &EventTime, event_end: &EventTime) -> bool {
        if let (EventTime::AllDay(start), EventTime::AllDay(end)) = (event_start, event_end) {
            return *start <= self.last_day && *end > self.first_day;
        }
        let start = event_start.to_utc_datetime();
        let end = event_end.to_utc_datetime();
        start <= self.end && end > self.start
    }
}

/// Local midnight on `date`, or the first instant of the day when midnight
/// falls into a DST gap.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Utc>, WindowError> {
    let midnight = date.and_time(NaiveTime::MIN);
    if let Some(dt) = tz.from_local_datetime(&midnight).earliest() {
        return Ok(dt.with_timezone(&Utc));
    }

    // Gaps are at most a couple of hours wide; walk forward in minute steps.
    (1..=180)
        .map(|minutes| midnight + Duration::minutes(minutes))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(WindowError::NonexistentLocalTime(midnight))
}

/// 23:59:59.999 local time on `date`. When that wall-clock time occurs twice,
/// the later instant wins.
fn end_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Utc>, WindowError> {
    let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    let naive = date.and_time(last_milli);
    if let Some(dt) = tz.from_local_datetime(&naive).latest() {
        return Ok(dt.with_timezone(&Utc));
    }

    (1..=180)
        .map(|minutes| naive - Duration::minutes(minutes))
        .find_map(|candidate| tz.from_local_datetime(&candidate).latest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(WindowError::NonexistentLocalTime(naive))
}
