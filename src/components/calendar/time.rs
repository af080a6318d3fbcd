use crate::components::calendar::models::EventDateTime;
use crate::error::{operation_error, SyncResult};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, SecondsFormat, TimeZone};
use chrono_tz::Tz;

/// Event length when a case has no explicit end time
pub const DEFAULT_EVENT_DURATION_HOURS: i64 = 2;

/// Parse time string in HH:MM format
pub fn parse_time(time_str: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hour = parts[0].parse::<u32>().ok()?;
    let minute = parts[1].parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Interpret a calendar date plus HH:MM wall-clock in the clinic timezone.
///
/// Goes through the zone's calendar arithmetic so day boundaries and DST
/// transitions resolve correctly; wall-clock values that are ambiguous or
/// nonexistent in the zone are rejected rather than guessed at.
pub fn zoned_datetime(zone: Tz, date: NaiveDate, time_str: &str) -> SyncResult<DateTime<Tz>> {
    let (hour, minute) = parse_time(time_str)
        .ok_or_else(|| operation_error(&format!("Invalid time format: {}", time_str)))?;

    match zone.with_ymd_and_hms(date.year(), date.month(), date.day(), hour, minute, 0) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(_, _) => Err(operation_error(&format!(
            "Ambiguous local time {} {} in {}",
            date, time_str, zone
        ))),
        LocalResult::None => Err(operation_error(&format!(
            "Nonexistent local time {} {} in {}",
            date, time_str, zone
        ))),
    }
}

/// Start and end instants for a case's calendar event.
///
/// A missing end time means start plus the default duration; an end past
/// midnight falls out of the instant arithmetic, no date juggling here.
pub fn event_window(
    zone: Tz,
    date: NaiveDate,
    start_time: &str,
    end_time: Option<&str>,
) -> SyncResult<(DateTime<Tz>, DateTime<Tz>)> {
    let start = zoned_datetime(zone, date, start_time)?;
    let end = match end_time {
        Some(t) => zoned_datetime(zone, date, t)?,
        None => start + Duration::hours(DEFAULT_EVENT_DURATION_HOURS),
    };
    Ok((start, end))
}

/// Wire-shape an instant: absolute RFC 3339 plus the named zone for display
pub fn event_datetime(instant: &DateTime<Tz>, zone: Tz) -> EventDateTime {
    EventDateTime {
        date_time: Some(instant.to_rfc3339_opts(SecondsFormat::Secs, false)),
        date: None,
        time_zone: Some(zone.name().to_string()),
    }
}
