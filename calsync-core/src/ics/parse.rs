//! Feed parsing using the icalendar crate's parser.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::event::SourceEvent;

/// Parse every VEVENT of a feed into a `SourceEvent`.
///
/// Events without a usable DTSTART are skipped.
pub fn parse_feed(content: &str) -> SyncResult<Vec<SourceEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| SyncError::Feed(e.to_string()))?;

    Ok(calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(parse_vevent)
        .collect())
}

fn parse_vevent(vevent: &Component) -> Option<SourceEvent> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .unwrap_or_default();

    let Some((start, tzid)) = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(apparent_instant)
    else {
        debug!(uid = %uid, "skipping feed event without DTSTART");
        return None;
    };

    // DTEND wins over DURATION; with neither the event has no length
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(|dpt| apparent_instant(dpt).0)
        .or_else(|| {
            vevent
                .find_prop("DURATION")
                .and_then(|p| parse_duration(p.val.as_ref()))
                .and_then(|length| start.checked_add_signed(length))
        })
        .unwrap_or(start);

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();
    let description = vevent
        .find_prop("DESCRIPTION")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_default();

    Some(SourceEvent {
        uid,
        summary,
        description,
        start,
        end,
        tzid,
    })
}

/// The wall-clock reading taken as UTC, plus the zone label it came with.
///
/// UTC stamps keep their instant and are labeled "UTC"; floating and
/// all-day values carry no label.
fn apparent_instant(dpt: DatePerhapsTime) -> (DateTime<Utc>, Option<String>) {
    match dpt {
        DatePerhapsTime::Date(d) => (d.and_time(NaiveTime::MIN).and_utc(), None),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => (dt, Some("UTC".to_string())),
            CalendarDateTime::Floating(naive) => (naive.and_utc(), None),
            CalendarDateTime::WithTimezone { date_time, tzid } => (date_time.and_utc(), Some(tzid)),
        },
    }
}

/// Parse a DURATION value (`PT90M`, `P1D`, `-PT15M`)
fn parse_duration(value: &str) -> Option<Duration> {
    let is_negative = value.starts_with('-');
    let unsigned = value.trim_start_matches(['-', '+']);

    let std_duration: std::time::Duration = iso8601::duration(unsigned).ok()?.into();
    let length = Duration::from_std(std_duration).ok()?;

    Some(if is_negative { -length } else { length })
}

/// Undo RFC 5545 TEXT escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
