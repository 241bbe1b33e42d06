// Timestamp parsing, calendar-day arithmetic and relative-time formatting
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};

/// Parse a `created_at` value as stored by the backend
///
/// Accepts RFC 3339 as well as the Postgres text form (`2024-05-01 10:00:00.123+00`).
/// Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Build a fixed offset from minutes east of UTC, falling back to UTC when out of range
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(utc_offset)
}

pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Calendar day an instant falls on, as seen from `offset`
pub fn day_of(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// 00:00:00 of `day` in `offset`, as a UTC instant
pub fn start_of_day(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    local_to_utc(day.and_time(NaiveTime::default()), offset)
}

/// 23:59:59 of `day` in `offset`, as a UTC instant
pub fn end_of_day(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    local_to_utc(
        day.and_time(NaiveTime::default()) + Duration::seconds(86_399),
        offset,
    )
}

fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc)
}

/// Parse an operator-typed date: `dd/mm/yyyy`, `yyyy-mm-dd` or `dd-mm-yyyy`
pub fn parse_day(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}

/// Like [`parse_day`], but `date_format` is tried first so that a date the
/// dashboard displayed can be typed back in as is
pub fn parse_day_as(input: &str, date_format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), date_format)
        .ok()
        .or_else(|| parse_day(input))
}

/// "3 minutes ago" style description of `then` relative to `now`
pub fn format_time_from_now(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    let (past, secs) = if delta.num_seconds() >= 0 {
        (true, delta.num_seconds())
    } else {
        (false, -delta.num_seconds())
    };

    let minutes = (secs as f64 / 60.0).round() as i64;
    let hours = (secs as f64 / 3600.0).round() as i64;
    let days = (secs as f64 / 86_400.0).round() as i64;

    let phrase = match secs {
        s if s < 45 => "a few seconds".to_string(),
        s if s < 90 => "a minute".to_string(),
        s if s < 45 * 60 => format!("{} minutes", minutes),
        s if s < 90 * 60 => "an hour".to_string(),
        s if s < 22 * 3600 => format!("{} hours", hours),
        s if s < 36 * 3600 => "a day".to_string(),
        s if s < 26 * 86_400 => format!("{} days", days),
        s if s < 46 * 86_400 => "a month".to_string(),
        s if s < 320 * 86_400 => format!("{} months", (days as f64 / 30.4).round() as i64),
        s if s < 548 * 86_400 => "a year".to_string(),
        _ => format!("{} years", (days as f64 / 365.0).round() as i64),
    };

    if past {
        format!("{} ago", phrase)
    } else {
        format!("in {}", phrase)
    }
}
