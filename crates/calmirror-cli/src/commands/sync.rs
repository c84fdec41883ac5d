//! The sync command.

use calmirror_providers::CalendarGateway;
use calmirror_sync::{ReconcileReport, SyncSettings, run_sync};
use chrono::{DateTime, Local, TimeZone};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Runs one sync with the configured gateway and the local clock.
///
/// Per-event failures are reported but do not fail the command.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let settings = config.sync.to_settings()?;
    let gateway = super::connect(config).await?;
    let report = execute(&gateway, &settings, &Local::now()).await?;
    println!("{}", render(&report));
    Ok(())
}

/// Runs one sync against `gateway`. Failed events are already logged by the
/// reconciler and only counted here.
pub async fn execute<Tz: TimeZone>(
    gateway: &dyn CalendarGateway,
    settings: &SyncSettings,
    now: &DateTime<Tz>,
) -> ClientResult<ReconcileReport> {
    Ok(run_sync(gateway, settings, now).await?)
}

/// Renders the one-line summary printed after a run.
pub fn render(report: &ReconcileReport) -> String {
    let summary = report.summary();
    let failed = report.failures().count();
    if failed == 0 {
        format!("sync complete: {}", summary)
    } else {
        format!("sync complete: {} ({} failed)", summary, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use calmirror_core::{EventHandle, EventRecord, EventTime, ExclusionConfig};
    use calmirror_providers::MemoryGateway;
    use chrono::{Duration, Utc};
    use tracing_test::traced_test;

    fn gateway_with_meeting(now: DateTime<Utc>) -> MemoryGateway {
        let gateway = MemoryGateway::new()
            .with_calendar("work", "Work")
            .with_calendar("home", "Home");
        gateway.insert_event(
            EventRecord::new(
                EventHandle::new("work", "1"),
                EventTime::from_utc(now + Duration::hours(1)),
                EventTime::from_utc(now + Duration::hours(2)),
            )
            .with_title("Design Review"),
        );
        gateway
    }

    fn settings() -> SyncSettings {
        SyncSettings::new("work", "home").with_exclusions(ExclusionConfig::new(["home"]))
    }

    #[tokio::test]
    async fn execute_reports_summary() {
        let now = Utc::now();
        let gateway = gateway_with_meeting(now);

        let report = execute(&gateway, &settings(), &now).await.unwrap();

        assert_eq!(render(&report), "sync complete: created 1, deleted 0");
        assert_eq!(gateway.titles("home"), ["Design Review [Synced]"]);
    }

    #[tokio::test]
    async fn per_event_failures_do_not_fail_the_run() {
        let now = Utc::now();
        let gateway = gateway_with_meeting(now);
        gateway.fail_create("Design Review [Synced]");

        let report = execute(&gateway, &settings(), &now).await.unwrap();

        assert_eq!(render(&report), "sync complete: created 0, deleted 0 (1 failed)");
        let failed: Vec<&str> = report.failures().map(|o| o.title.as_str()).collect();
        assert_eq!(failed, ["Design Review"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn each_failure_is_logged_once() {
        let now = Utc::now();
        let gateway = gateway_with_meeting(now);
        gateway.fail_create("Design Review [Synced]");

        execute(&gateway, &settings(), &now).await.unwrap();

        logs_assert(|lines: &[&str]| {
            let mentions = lines
                .iter()
                .filter(|line| line.contains("WARN") && line.contains("Design Review"))
                .count();
            match mentions {
                1 => Ok(()),
                n => Err(format!("expected one warning for the failed event, got {n}")),
            }
        });
    }

    #[tokio::test]
    async fn fatal_errors_propagate() {
        let now = Utc::now();
        let gateway = gateway_with_meeting(now);
        gateway.fail_resolve("home");

        let err = execute(&gateway, &settings(), &now).await.unwrap_err();
        assert!(matches!(err, ClientError::Sync(_)));
        assert!(err.to_string().contains("destination calendar 'home'"));
    }
}
