//! Core types: event records, sync window, exclusion policy, tracing

pub mod event;
pub mod policy;
pub mod time;
pub mod tracing;

pub use event::{AttendeeStatus, EventHandle, EventRecord, NewEvent, OverallStatus};
pub use policy::{ExclusionConfig, ExclusionReason, exclusion_reason, is_excluded};
pub use time::{EventTime, SyncWindow, WindowError};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
