//! Time window bounding the instance expansion of a series.

use chrono::{DateTime, Duration, Utc};

use crate::event::SourceEvent;
use crate::matcher::Compensation;

/// Closed interval `[min, max]` in real (compensated) instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
}

impl Window {
    /// Smallest window covering every start and end of `sources`.
    ///
    /// Returns `None` for an empty set: there is nothing to reconcile.
    pub fn spanning(sources: &[&SourceEvent], compensation: &Compensation) -> Option<Window> {
        let stamps = sources.iter().flat_map(|event| {
            [
                compensation.adjusted_start(event),
                compensation.adjusted_end(event),
            ]
        });

        stamps.fold(None, |window, stamp| match window {
            None => Some(Window {
                min: stamp,
                max: stamp,
            }),
            Some(Window { min, max }) => Some(Window {
                min: min.min(stamp),
                max: max.max(stamp),
            }),
        })
    }

    /// Exclusive upper bound on instance starts covering `max` itself.
    ///
    /// Calendar queries treat their upper bound as exclusive and are sent at
    /// second precision, so one second is added.
    pub fn exclusive_end(&self) -> DateTime<Utc> {
        self.max
            .checked_add_signed(Duration::seconds(1))
            .unwrap_or(self.max)
    }
}
