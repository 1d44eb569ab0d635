//! Publish-time and download-period helpers.
//!
//! npm documents carry a `time` map of version (plus `created`/`modified`)
//! to RFC 3339 timestamps; the downloads API takes a `start:end` day range.

use chrono::{DateTime, Duration, Utc};

/// Latest parsable timestamp among the values of a document's `time` map
pub fn last_publish_time<'a, I>(times: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = &'a str>,
{
    times
        .into_iter()
        .filter_map(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|time| time.with_timezone(&Utc))
        .max()
}

/// Format a timestamp as `YYYY-MM-DD`
pub fn format_date(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}

/// `time` moved back by `window_days` days, or `None` past chrono's range
fn window_start(time: DateTime<Utc>, window_days: u32) -> Option<DateTime<Utc>> {
    time.checked_sub_signed(Duration::days(i64::from(window_days)))
}

/// Download period covering `window_days` days and ending at `last`.
///
/// The start clamps to the earliest representable date.
pub fn download_period(last: DateTime<Utc>, window_days: u32) -> String {
    let start = window_start(last, window_days).unwrap_or(DateTime::<Utc>::MIN_UTC);
    format!("{}:{}", format_date(start), format_date(last))
}

/// Whether `last` falls within `window_days` days before `now`
pub fn is_active(last: DateTime<Utc>, now: DateTime<Utc>, window_days: u32) -> bool {
    // A window reaching past the earliest date covers everything
    window_start(now, window_days).map_or(true, |start| last >= start)
}
