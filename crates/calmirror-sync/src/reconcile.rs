//! Clear-and-recreate reconciliation.
//!
//! A run first deletes every destination event in the window whose title
//! carries the marker, then re-creates one marked copy per eligible source
//! event. Nothing links a copy to its source except the marker, so the
//! destination converges to the source on every run without stored state.
//!
//! Per-event failures never abort a pass; they are collected into the
//! [`ReconcileReport`] and counted out of the summary.

use std::fmt;

use calmirror_core::{
    EventHandle, EventRecord, ExclusionConfig, ExclusionReason, NewEvent, SyncWindow,
    exclusion_reason,
};
use calmirror_providers::{CalendarGateway, CalendarHandle, ProviderError};
use tracing::{debug, info, instrument, warn};

use crate::error::{CalendarRole, SyncError, SyncResult};

/// The result of one create or delete attempt.
#[derive(Debug)]
pub struct EventOutcome {
    /// Title of the deleted destination event, or of the source event a
    /// creation was attempted for.
    pub title: String,
    /// The affected event on success.
    pub result: Result<EventHandle, ProviderError>,
}

impl EventOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A source event that was not mirrored, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub title: String,
    pub reason: ExclusionReason,
}

/// Counts of successful mutations in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub deleted: usize,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "created {}, deleted {}", self.created, self.deleted)
    }
}

/// Everything that happened during a reconciliation.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// One entry per marked destination event, in the order attempted.
    pub deletions: Vec<EventOutcome>,
    /// One entry per eligible source event, in the order attempted.
    pub creations: Vec<EventOutcome>,
    /// Source events skipped by the exclusion policy.
    pub exclusions: Vec<Exclusion>,
}

impl ReconcileReport {
    /// Returns the number of successful creations and deletions.
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            created: self.creations.iter().filter(|o| o.is_ok()).count(),
            deleted: self.deletions.iter().filter(|o| o.is_ok()).count(),
        }
    }

    /// Returns every failed attempt, deletions first.
    pub fn failures(&self) -> impl Iterator<Item = &EventOutcome> {
        self.deletions
            .iter()
            .chain(self.creations.iter())
            .filter(|o| !o.is_ok())
    }

    /// Returns true if every attempted mutation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Mirrors eligible `source` events into `destination` for `window`.
///
/// Deletion of previously mirrored events completes before any creation
/// starts. Destination events without `marker` in their title are never
/// touched.
///
/// # Errors
///
/// Returns [`SyncError::Fetch`] if either calendar cannot be listed. A
/// source listing failure happens after cleanup, whose deletions stand.
pub async fn reconcile(
    gateway: &dyn CalendarGateway,
    source: &CalendarHandle,
    destination: &CalendarHandle,
    window: &SyncWindow,
    policy: &ExclusionConfig,
    marker: &str,
) -> SyncResult<ReconcileReport> {
    let mut report = ReconcileReport {
        deletions: cleanup_pass(gateway, destination, window, marker).await?,
        ..ReconcileReport::default()
    };

    let (creations, exclusions) =
        creation_pass(gateway, source, destination, window, policy, marker).await?;
    report.creations = creations;
    report.exclusions = exclusions;

    Ok(report)
}

#[instrument(name = "cleanup", skip_all, fields(calendar = %destination.name))]
async fn cleanup_pass(
    gateway: &dyn CalendarGateway,
    destination: &CalendarHandle,
    window: &SyncWindow,
    marker: &str,
) -> SyncResult<Vec<EventOutcome>> {
    let events = gateway
        .list_events(destination, window)
        .await
        .map_err(|e| SyncError::fetch(CalendarRole::Destination, e))?;

    let marked: Vec<EventRecord> = events.into_iter().filter(|e| e.has_marker(marker)).collect();
    info!(count = marked.len(), "deleting previously mirrored events");

    let mut outcomes = Vec::with_capacity(marked.len());
    for event in marked {
        debug!(title = %event.title, id = %event.handle.event_id, "deleting");
        let result = gateway
            .delete_event(&event.handle)
            .await
            .map(|()| event.handle.clone());

        match &result {
            Ok(_) => info!(title = %event.title, "deleted"),
            Err(e) => warn!(title = %event.title, error = %e, "failed to delete"),
        }
        outcomes.push(EventOutcome {
            title: event.title,
            result,
        });
    }

    Ok(outcomes)
}

#[instrument(name = "create", skip_all, fields(calendar = %destination.name))]
async fn creation_pass(
    gateway: &dyn CalendarGateway,
    source: &CalendarHandle,
    destination: &CalendarHandle,
    window: &SyncWindow,
    policy: &ExclusionConfig,
    marker: &str,
) -> SyncResult<(Vec<EventOutcome>, Vec<Exclusion>)> {
    let events = gateway
        .list_events(source, window)
        .await
        .map_err(|e| SyncError::fetch(CalendarRole::Source, e))?;
    info!(count = events.len(), source = %source.name, "evaluating source events");

    let mut outcomes = Vec::new();
    let mut exclusions = Vec::new();

    for event in events {
        if let Some(reason) = exclusion_reason(&event, policy) {
            info!(title = %event.title, reason = %reason, "excluded");
            exclusions.push(Exclusion {
                title: event.title,
                reason,
            });
            continue;
        }

        let mirror = NewEvent::mirror_of(&event, marker);
        debug!(title = %mirror.title, all_day = mirror.is_all_day(), "creating");

        let result = if mirror.is_all_day() {
            gateway.create_all_day_event(destination, &mirror).await
        } else {
            gateway.create_event(destination, &mirror).await
        };

        match &result {
            Ok(_) => info!(title = %event.title, mirror = %mirror.title, "created"),
            Err(e) => warn!(
                title = %event.title,
                mirror = %mirror.title,
                error = %e,
                "failed to create"
            ),
        }
        outcomes.push(EventOutcome {
            title: event.title,
            result,
        });
    }

    Ok((outcomes, exclusions))
}
