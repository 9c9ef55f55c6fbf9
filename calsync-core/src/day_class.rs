//! Weekday groupings used to pair feed events with calendar series.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Local, Weekday};
use chrono_tz::Tz;

use crate::event::{DestinationEvent, SourceEvent};

/// One of the three disjoint groups of weekdays. Sunday belongs to none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayClass {
    TueThu,
    MonWedFri,
    Sat,
}

impl DayClass {
    /// Every class, in the order a cycle reconciles them.
    pub const ALL: [DayClass; 3] = [DayClass::TueThu, DayClass::MonWedFri, DayClass::Sat];

    pub fn days(self) -> &'static [Weekday] {
        match self {
            DayClass::TueThu => &[Weekday::Tue, Weekday::Thu],
            DayClass::MonWedFri => &[Weekday::Mon, Weekday::Wed, Weekday::Fri],
            DayClass::Sat => &[Weekday::Sat],
        }
    }

    pub fn of(weekday: Weekday) -> Option<DayClass> {
        DayClass::ALL.into_iter().find(|class| class.contains(weekday))
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        self.days().contains(&weekday)
    }
}

impl fmt::Display for DayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DayClass::TueThu => "tue/thu",
            DayClass::MonWedFri => "mon/wed/fri",
            DayClass::Sat => "sat",
        };
        f.write_str(label)
    }
}

/// Timezone in which the weekday of a calendar series start is read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum WeekdayZone {
    /// The timezone of the running process.
    #[default]
    Local,
    Named(Tz),
}

impl WeekdayZone {
    pub fn weekday(&self, instant: DateTime<FixedOffset>) -> Weekday {
        match self {
            WeekdayZone::Local => instant.with_timezone(&Local).weekday(),
            WeekdayZone::Named(tz) => instant.with_timezone(tz).weekday(),
        }
    }
}

/// Feed events whose start falls in `class`.
///
/// The weekday is read from the feed's own wall-clock, which is what the
/// apparent UTC start encodes.
pub fn sources_in_class(sources: &[SourceEvent], class: DayClass) -> Vec<&SourceEvent> {
    sources
        .iter()
        .filter(|event| class.contains(event.start.weekday()))
        .collect()
}

/// Outcome of picking the calendar series for a class.
#[derive(Debug, Default)]
pub struct SeriesSelection<'a> {
    pub series: Option<&'a DestinationEvent>,
    /// Other series that also fell in the class, in tie-break order.
    pub passed_over: Vec<&'a DestinationEvent>,
}

/// Pick the recurring series that covers `class`.
///
/// Candidates are recurring events with a timed start on one of the class's
/// days. The earliest start wins, then the smallest id.
pub fn select_series(
    events: &[DestinationEvent],
    class: DayClass,
    zone: WeekdayZone,
) -> SeriesSelection<'_> {
    let mut candidates: Vec<(DateTime<FixedOffset>, &DestinationEvent)> = events
        .iter()
        .filter(|event| event.is_recurring())
        .filter_map(|event| event.start().map(|start| (start, event)))
        .filter(|(start, _)| class.contains(zone.weekday(*start)))
        .collect();

    candidates.sort_by(|(a_start, a), (b_start, b)| {
        a_start.cmp(b_start).then_with(|| a.id().cmp(b.id()))
    });

    let mut ordered = candidates.into_iter().map(|(_, event)| event);
    SeriesSelection {
        series: ordered.next(),
        passed_over: ordered.collect(),
    }
}
