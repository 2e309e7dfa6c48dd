//! Expand command.

use std::path::PathBuf;

use campusmeet_core::{CountPolicy, DateWindow, Meeting, MeetingId};
use campusmeet_service::RequestHandler;
use chrono::NaiveDate;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::render::OccurrenceFormatter;

/// Prints the occurrences of a meeting.
pub async fn run(
    config: &ClientConfig,
    snapshot: Option<PathBuf>,
    meeting_id: MeetingId,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    count_policy: Option<CountPolicy>,
    json: bool,
) -> ClientResult<()> {
    let path = super::snapshot_path(snapshot, config)?;
    let mut service = config.service_config()?;
    if let Some(policy) = count_policy {
        service = service.with_count_policy(policy);
    }
    let handler = super::load_handler(&path, service)?;
    let output = render(&handler, config, meeting_id, from, to, json).await?;
    println!("{output}");
    Ok(())
}

/// Expands a stored meeting and formats the result.
pub async fn render(
    handler: &RequestHandler,
    config: &ClientConfig,
    meeting_id: MeetingId,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> ClientResult<String> {
    config.validate()?;
    let meeting = handler.store().read().await.meeting(meeting_id)?.clone();
    let window = resolve_window(&meeting, from, to, config.expand.default_window_days)?;
    debug!(meeting_id, ?window, "Expanding meeting");

    let occurrences = handler.expand(meeting_id, window).await?;
    let formatter = OccurrenceFormatter::new(config.output.clone());
    if json || config.output.json {
        Ok(serde_json::to_string_pretty(
            &formatter.format_json(&meeting, &occurrences),
        )?)
    } else {
        Ok(formatter.format_table(&meeting, &occurrences))
    }
}

/// Builds the window for an expansion from the command-line dates.
///
/// A missing start falls back to the meeting's first date. A missing end
/// yields a `default_days` window, except that a meeting which terminates on
/// its own is expanded without a window when neither date is given.
pub fn resolve_window(
    meeting: &Meeting,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    default_days: u32,
) -> ClientResult<Option<DateWindow>> {
    let window = match (from, to) {
        (Some(start), Some(end)) => Some(DateWindow::new(start, end)?),
        (Some(start), None) => Some(DateWindow::from_days(start, default_days)),
        (None, Some(end)) => Some(DateWindow::new(meeting.start_date, end)?),
        (None, None) if needs_window(meeting) => {
            Some(DateWindow::from_days(meeting.start_date, default_days))
        }
        (None, None) => None,
    };
    Ok(window)
}

fn needs_window(meeting: &Meeting) -> bool {
    meeting
        .recurrence
        .as_ref()
        .is_some_and(|rule| !rule.is_bounded())
}
