use chrono::{DateTime, NaiveDateTime, Utc};
use croner::Cron;

use crate::error::{Result, ScheduleError};

/// Compute the next UTC execution time for `cron` strictly *after* `from`.
///
/// An empty expression means the job has no schedule and yields `None`.
pub fn next_execution(cron: &str, from: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let cron = cron.trim();
    if cron.is_empty() {
        return Ok(None);
    }

    let parsed = Cron::new(cron)
        .parse()
        .map_err(|e| ScheduleError::InvalidCron {
            cron: cron.to_string(),
            reason: e.to_string(),
        })?;

    parsed
        .find_next_occurrence(&from, false)
        .map(Some)
        .map_err(|e| ScheduleError::InvalidCron {
            cron: cron.to_string(),
            reason: e.to_string(),
        })
}

/// Format the time between two ISO-8601 instants as `"{H}h {MM}m {SS}s"`.
///
/// The hours segment is left out when zero; minutes and seconds are always
/// two digits. Durations longer than a day keep counting hours.
pub fn elapsed(start: &str, end: &str) -> Result<String> {
    let start = parse_instant(start)?;
    let end = parse_instant(end)?;
    let total = (end - start).num_seconds();
    if total < 0 {
        return Err(ScheduleError::Timestamp(format!(
            "end {end} is before start {start}"
        )));
    }

    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        Ok(format!("{hours}h {minutes:02}m {seconds:02}s"))
    } else {
        Ok(format!("{minutes:02}m {seconds:02}s"))
    }
}

/// Parse an RFC 3339 instant; offset-less timestamps are taken as UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ScheduleError::Timestamp(format!("'{raw}': {e}")))
}
