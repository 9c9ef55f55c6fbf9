//! Aligning calendar instances with feed events by start time.
//!
//! Feed timestamps carry a zone label but their instant is the wall-clock
//! reading taken as UTC. A `Compensation` turns that apparent instant into
//! the real one before comparing it with a calendar instance.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

use crate::event::{DestinationEvent, SourceEvent};

/// Hours added to an apparent feed instant under Pacific Daylight Time.
pub const PACIFIC_DAYLIGHT_OFFSET_HOURS: i64 = 7;

/// How an apparent feed instant is turned into a real one.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// Add a fixed offset. Does not follow daylight saving: with the default
    /// of +7h it is one hour off while Pacific Standard Time is in effect.
    FixedOffset(Duration),
    /// Read the wall-clock in the event's own zone label (or `fallback`)
    /// through the tz database.
    ZoneAware { fallback: Tz },
}

impl Default for Compensation {
    fn default() -> Self {
        Compensation::FixedOffset(Duration::hours(PACIFIC_DAYLIGHT_OFFSET_HOURS))
    }
}

impl Compensation {
    pub fn adjust(&self, apparent: DateTime<Utc>, tzid: Option<&str>) -> DateTime<Utc> {
        match self {
            Compensation::FixedOffset(offset) => {
                apparent.checked_add_signed(*offset).unwrap_or(apparent)
            }
            Compensation::ZoneAware { fallback } => {
                let tz = tzid
                    .and_then(|label| label.parse::<Tz>().ok())
                    .unwrap_or(*fallback);
                let wall = apparent.naive_utc();

                // Wall-clock readings inside a spring-forward gap move one hour later
                tz.from_local_datetime(&wall)
                    .earliest()
                    .or_else(|| tz.from_local_datetime(&(wall + Duration::hours(1))).earliest())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(apparent)
            }
        }
    }

    /// The instant a feed event really starts at.
    pub fn adjusted_start(&self, event: &SourceEvent) -> DateTime<Utc> {
        self.adjust(event.start, event.tzid.as_deref())
    }

    pub fn adjusted_end(&self, event: &SourceEvent) -> DateTime<Utc> {
        self.adjust(event.end, event.tzid.as_deref())
    }
}

/// Result of looking up the feed event for one calendar instance.
#[derive(Debug, PartialEq)]
pub enum InstanceMatch<'a> {
    Matched(&'a SourceEvent),
    Unmatched,
    /// Several feed events start at the instance's start.
    Ambiguous(Vec<&'a SourceEvent>),
}

/// Find the feed event whose adjusted start equals the instance start, to the millisecond.
pub fn match_instance<'a>(
    instance: &DestinationEvent,
    sources: &[&'a SourceEvent],
    compensation: &Compensation,
) -> InstanceMatch<'a> {
    let Some(start) = instance.start() else {
        return InstanceMatch::Unmatched;
    };
    let target = start.timestamp_millis();

    let mut hits: Vec<&SourceEvent> = sources
        .iter()
        .copied()
        .filter(|event| compensation.adjusted_start(event).timestamp_millis() == target)
        .collect();

    match hits.len() {
        0 => InstanceMatch::Unmatched,
        1 => InstanceMatch::Matched(hits.remove(0)),
        _ => InstanceMatch::Ambiguous(hits),
    }
}
