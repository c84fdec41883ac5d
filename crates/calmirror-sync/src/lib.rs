//! Mirrors events from a source calendar into a destination calendar.
//!
//! - [`run_sync`] - compute the window, resolve both calendars, reconcile
//! - [`reconcile`] - delete marked events, then re-create eligible ones
//! - [`SyncError`] - failures that abort a run

pub mod error;
pub mod reconcile;
pub mod run;

pub use error::{CalendarRole, SyncError, SyncResult};
pub use reconcile::{EventOutcome, Exclusion, ReconcileReport, SyncSummary, reconcile};
pub use run::{DEFAULT_FUTURE_DAYS, DEFAULT_MARKER, SyncSettings, run_sync};
