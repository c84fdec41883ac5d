//! One complete sync run: window, calendar resolution, reconciliation.

use calmirror_core::{ExclusionConfig, SyncWindow};
use calmirror_providers::CalendarGateway;
use chrono::{DateTime, TimeZone};
use tracing::{info, instrument, warn};

use crate::error::{CalendarRole, SyncError, SyncResult};
use crate::reconcile::{ReconcileReport, reconcile};

/// Title suffix that identifies mirrored events.
pub const DEFAULT_MARKER: &str = "[Synced]";

/// Default number of days after today covered by a run.
pub const DEFAULT_FUTURE_DAYS: u32 = 90;

/// What to mirror, where, and over which days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub source_calendar_id: String,
    pub destination_calendar_id: String,
    pub marker: String,
    pub past_days: u32,
    pub future_days: u32,
    pub exclusions: ExclusionConfig,
}

impl SyncSettings {
    pub fn new(source_calendar_id: impl Into<String>, destination_calendar_id: impl Into<String>) -> Self {
        Self {
            source_calendar_id: source_calendar_id.into(),
            destination_calendar_id: destination_calendar_id.into(),
            marker: DEFAULT_MARKER.to_string(),
            past_days: 0,
            future_days: DEFAULT_FUTURE_DAYS,
            exclusions: ExclusionConfig::default(),
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_past_days(mut self, days: u32) -> Self {
        self.past_days = days;
        self
    }

    pub fn with_future_days(mut self, days: u32) -> Self {
        self.future_days = days;
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionConfig) -> Self {
        self.exclusions = exclusions;
        self
    }
}

/// Runs one sync against `gateway`.
///
/// The window is computed from `now` before anything is fetched. Both
/// calendars must resolve before any mutation happens; the source is
/// resolved first.
///
/// Per-event failures are returned inside the report. Use
/// [`ReconcileReport::is_clean`] to decide the process outcome.
#[instrument(
    name = "sync",
    skip_all,
    fields(
        gateway = gateway.name(),
        source = %settings.source_calendar_id,
        destination = %settings.destination_calendar_id,
    )
)]
pub async fn run_sync<Tz: TimeZone>(
    gateway: &dyn CalendarGateway,
    settings: &SyncSettings,
    now: &DateTime<Tz>,
) -> SyncResult<ReconcileReport> {
    let window = SyncWindow::compute(settings.past_days, settings.future_days, now)?;

    let source = gateway
        .resolve_calendar(&settings.source_calendar_id)
        .await
        .map_err(|e| SyncError::calendar_not_found(CalendarRole::Source, &settings.source_calendar_id, e))?;
    let destination = gateway
        .resolve_calendar(&settings.destination_calendar_id)
        .await
        .map_err(|e| {
            SyncError::calendar_not_found(CalendarRole::Destination, &settings.destination_calendar_id, e)
        })?;

    info!(
        source = %source.name,
        destination = %destination.name,
        first_day = %window.first_day,
        last_day = %window.last_day,
        "syncing"
    );

    let report = reconcile(
        gateway,
        &source,
        &destination,
        &window,
        &settings.exclusions,
        &settings.marker,
    )
    .await?;

    let summary = report.summary();
    let failed = report.failures().count();
    if failed > 0 {
        warn!(
            created = summary.created,
            deleted = summary.deleted,
            failed,
            excluded = report.exclusions.len(),
            "sync finished with failures"
        );
    } else {
        info!(
            created = summary.created,
            deleted = summary.deleted,
            excluded = report.exclusions.len(),
            "sync finished"
        );
    }

    Ok(report)
}
