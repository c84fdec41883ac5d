//! The calendars command.

use calmirror_providers::{CalendarGateway, CalendarInfo};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Prints every calendar the configured account can see.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let gateway = super::connect(config).await?;
    for line in list(&gateway).await? {
        println!("{}", line);
    }
    Ok(())
}

/// Lists calendars, primary first and then by name.
pub async fn list(gateway: &dyn CalendarGateway) -> ClientResult<Vec<String>> {
    let mut calendars = gateway.list_calendars().await?;
    calendars.sort_by(|a, b| {
        b.is_primary
            .cmp(&a.is_primary)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(calendars.iter().map(format_calendar).collect())
}

fn format_calendar(calendar: &CalendarInfo) -> String {
    let mut line = format!("{}\t{}", calendar.id, calendar.name);
    if calendar.is_primary {
        line.push_str("\t(primary)");
    }
    if !calendar.is_writable() {
        line.push_str("\t(read-only)");
    }
    line
}
