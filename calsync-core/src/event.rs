//! Event types on both sides of a sync.
//!
//! Source events come from the iCal feed and are fully modeled. Destination
//! events are kept as the calendar's own JSON resource so that an update can
//! send back every field it received, including the ones calsync never reads.

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};

/// An event read from the iCal feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub uid: String,
    pub summary: String,
    pub description: String,
    /// Apparent start: the feed's wall-clock reading taken as if it were UTC.
    pub start: DateTime<Utc>,
    /// Apparent end, same encoding as `start`.
    pub end: DateTime<Utc>,
    /// Zone label the feed attached to the timestamps, if any.
    pub tzid: Option<String>,
}

/// A calendar resource (series or instance) as returned by the calendar API.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationEvent {
    id: String,
    start: Option<DateTime<FixedOffset>>,
    body: Value,
}

impl DestinationEvent {
    /// Wrap a JSON resource. The resource must be an object with a string `id`.
    pub fn from_json(body: Value) -> SyncResult<Self> {
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SyncError::Fetch("calendar returned an event without an id".into()))?
            .to_string();

        let start = body
            .pointer("/start/dateTime")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok());

        Ok(DestinationEvent { id, start, body })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Timed start with the offset the calendar declared. `None` for all-day events.
    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        self.start
    }

    pub fn description(&self) -> Option<&str> {
        self.body.get("description").and_then(Value::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        self.body.get("summary").and_then(Value::as_str)
    }

    /// Whether this is the definition of a recurring series.
    pub fn is_recurring(&self) -> bool {
        self.body
            .get("recurrence")
            .and_then(Value::as_array)
            .is_some_and(|rules| !rules.is_empty())
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Deep copy of this resource with only `description` replaced.
    ///
    /// The calendar omits empty descriptions, so an empty description is not
    /// written onto a resource that has none.
    pub fn with_description(&self, description: &str) -> DestinationEvent {
        let mut body = self.body.clone();

        if let Value::Object(map) = &mut body {
            let absent = matches!(map.get("description"), None | Some(Value::Null));
            if !(description.is_empty() && absent) {
                map.insert(
                    "description".to_string(),
                    Value::String(description.to_string()),
                );
            }
        }

        DestinationEvent {
            id: self.id.clone(),
            start: self.start,
            body,
        }
    }
}
