//! One sync cycle: fetch both sides, reconcile each day class, write back.

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::client::{Authenticator, CalendarClient, FeedSource, list_all_events, list_all_instances};
use crate::day_class::{DayClass, WeekdayZone, select_series, sources_in_class};
use crate::error::SyncResult;
use crate::event::{DestinationEvent, SourceEvent};
use crate::matcher::Compensation;
use crate::reconcile::plan_class;
use crate::report::{ClassReport, CycleReport, SeriesConflict};
use crate::window::Window;

/// Knobs of the matching and write-back steps.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub compensation: Compensation,
    pub weekday_zone: WeekdayZone,
    /// Ask the calendar to notify attendees of every update.
    pub notify_attendees: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            compensation: Compensation::default(),
            weekday_zone: WeekdayZone::default(),
            notify_attendees: true,
        }
    }
}

/// Run one full cycle.
///
/// Any error aborts the rest of the cycle; updates already issued stay issued.
pub async fn run_cycle<A, F>(auth: &A, feed: &F, options: &SyncOptions) -> SyncResult<CycleReport>
where
    A: Authenticator + ?Sized,
    F: FeedSource + ?Sized,
{
    let client = auth.connect().await?;

    info!("syncing...");
    let (sources, events) = tokio::try_join!(feed.fetch_events(), list_all_events(&client))?;
    debug!(
        feed_events = sources.len(),
        calendar_events = events.len(),
        "fetched both sides"
    );

    let mut report = CycleReport::default();
    for class in DayClass::ALL {
        let class_report = reconcile_class(&client, class, &sources, &events, options).await?;
        report.classes.push(class_report);
    }

    Ok(report)
}

/// Reconcile the instances of the series covering `class`.
pub async fn reconcile_class<C>(
    client: &C,
    class: DayClass,
    sources: &[SourceEvent],
    events: &[DestinationEvent],
    options: &SyncOptions,
) -> SyncResult<ClassReport>
where
    C: CalendarClient + ?Sized,
{
    let mut report = ClassReport::new(class);

    let selection = select_series(events, class, options.weekday_zone);
    let Some(series) = selection.series else {
        debug!(%class, "no recurring series for class, skipping");
        return Ok(report);
    };
    report.series_id = Some(series.id().to_string());

    if !selection.passed_over.is_empty() {
        let conflict = SeriesConflict {
            selected: series.id().to_string(),
            passed_over: selection
                .passed_over
                .iter()
                .map(|e| e.id().to_string())
                .collect(),
        };
        warn!(
            %class,
            selected = %conflict.selected,
            passed_over = ?conflict.passed_over,
            "several recurring series fall in this class"
        );
        report.series_conflict = Some(conflict);
    }

    let class_sources = sources_in_class(sources, class);
    let Some(window) = Window::spanning(&class_sources, &options.compensation) else {
        debug!(%class, series_id = series.id(), "no feed events for class");
        return Ok(report);
    };

    let instances = list_all_instances(client, series.id(), Some(&window)).await?;
    let plan = plan_class(&instances, &class_sources, &options.compensation);

    for conflict in &plan.conflicts {
        warn!(
            %class,
            event_id = %conflict.instance_id,
            source_uids = ?conflict.source_uids,
            "several feed events match this instance, leaving it alone"
        );
    }

    let mut pending = Vec::with_capacity(plan.updates.len());
    for candidate in &plan.updates {
        info!(event_id = candidate.id(), "updating");
        pending.push(client.update_event(candidate, options.notify_attendees));
    }
    join_all(pending)
        .await
        .into_iter()
        .collect::<SyncResult<Vec<()>>>()?;

    report.examined = instances.len();
    report.updated = plan.updates.len();
    report.unchanged = plan.unchanged;
    report.unmatched = plan.unmatched;
    report.instance_conflicts = plan.conflicts;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Page;
    use crate::error::SyncError;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use chrono_tz::Tz;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        list: AtomicUsize,
        instances: Mutex<Vec<(String, Option<Window>)>>,
        updates: Mutex<Vec<(String, Value, bool)>>,
    }

    #[derive(Clone, Default)]
    struct FakeCalendar {
        events: Vec<Value>,
        instances: HashMap<String, Vec<Value>>,
        failing_update: Option<String>,
        calls: Arc<Calls>,
    }

    fn page(values: &[Value]) -> SyncResult<Page> {
        Ok(Page {
            items: values
                .iter()
                .cloned()
                .map(DestinationEvent::from_json)
                .collect::<SyncResult<_>>()?,
            next_page_token: None,
        })
    }

    #[async_trait]
    impl CalendarClient for FakeCalendar {
        async fn list_events_page(&self, _page_token: Option<&str>) -> SyncResult<Page> {
            self.calls.list.fetch_add(1, Ordering::SeqCst);
            page(&self.events)
        }

        async fn instances_page(
            &self,
            series_id: &str,
            window: Option<&Window>,
            _page_token: Option<&str>,
        ) -> SyncResult<Page> {
            self.calls
                .instances
                .lock()
                .unwrap()
                .push((series_id.to_string(), window.copied()));
            page(self.instances.get(series_id).map(Vec::as_slice).unwrap_or(&[]))
        }

        async fn update_event(
            &self,
            event: &DestinationEvent,
            notify_attendees: bool,
        ) -> SyncResult<()> {
            if self.failing_update.as_deref() == Some(event.id()) {
                return Err(SyncError::update(event.id(), "503 Service Unavailable"));
            }
            self.calls.updates.lock().unwrap().push((
                event.id().to_string(),
                event.body().clone(),
                notify_attendees,
            ));
            Ok(())
        }
    }

    struct FakeAuth {
        calendar: Option<FakeCalendar>,
    }

    #[async_trait]
    impl Authenticator for FakeAuth {
        type Client = FakeCalendar;

        async fn connect(&self) -> SyncResult<FakeCalendar> {
            self.calendar
                .clone()
                .ok_or_else(|| SyncError::Auth("invalid_grant".into()))
        }
    }

    struct FakeFeed {
        events: Vec<SourceEvent>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedSource for FakeFeed {
        async fn fetch_events(&self) -> SyncResult<Vec<SourceEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.events.clone())
        }
    }

    fn feed(events: Vec<SourceEvent>) -> FakeFeed {
        FakeFeed {
            events,
            calls: AtomicUsize::new(0),
        }
    }

    fn source(uid: &str, start: &str, description: &str) -> SourceEvent {
        let start = DateTime::parse_from_rfc3339(start).unwrap().with_timezone(&Utc);
        SourceEvent {
            uid: uid.into(),
            summary: "Practice".into(),
            description: description.into(),
            start,
            end: start + Duration::minutes(90),
            tzid: Some("America/Los_Angeles".into()),
        }
    }

    fn series(id: &str, start: &str) -> Value {
        json!({
            "id": id,
            "summary": "Practice",
            "start": { "dateTime": start },
            "recurrence": ["RRULE:FREQ=WEEKLY"],
        })
    }

    fn instance(id: &str, start: &str, description: &str) -> Value {
        json!({
            "id": id,
            "summary": "Practice",
            "description": description,
            "start": { "dateTime": start },
            "end": { "dateTime": start },
        })
    }

    fn options() -> SyncOptions {
        SyncOptions {
            weekday_zone: WeekdayZone::Named(Tz::UTC),
            ..SyncOptions::default()
        }
    }

    fn tue_thu_calendar(description: &str) -> FakeCalendar {
        FakeCalendar {
            events: vec![series("tt", "2016-04-12T12:20:00Z")],
            instances: HashMap::from([(
                "tt".to_string(),
                vec![instance("x1", "2016-04-19T12:20:00Z", description)],
            )]),
            ..FakeCalendar::default()
        }
    }

    #[tokio::test]
    async fn test_mismatched_description_is_updated() {
        let calendar = tue_thu_calendar("old");
        let calls = calendar.calls.clone();
        let auth = FakeAuth {
            calendar: Some(calendar),
        };
        let feed = feed(vec![source("a", "2016-04-19T05:20:00Z", "A")]);

        let report = run_cycle(&auth, &feed, &options()).await.unwrap();

        let updates = calls.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (id, body, notify) = &updates[0];
        assert_eq!(id, "x1");
        assert_eq!(body["description"], json!("A"));
        assert_eq!(body["summary"], json!("Practice"));
        assert!(*notify);

        let tue_thu = report.class(DayClass::TueThu).unwrap();
        assert_eq!(tue_thu.series_id.as_deref(), Some("tt"));
        assert_eq!(tue_thu.updated, 1);
        assert_eq!(report.updated(), 1);
    }

    #[tokio::test]
    async fn test_correct_description_issues_no_update() {
        let calendar = tue_thu_calendar("A");
        let calls = calendar.calls.clone();
        let auth = FakeAuth {
            calendar: Some(calendar),
        };
        let feed = feed(vec![source("a", "2016-04-19T05:20:00Z", "A")]);

        let report = run_cycle(&auth, &feed, &options()).await.unwrap();

        assert!(calls.updates.lock().unwrap().is_empty());
        assert_eq!(report.class(DayClass::TueThu).unwrap().unchanged, 1);
    }

    #[tokio::test]
    async fn test_class_without_series_is_skipped() {
        // only a Monday series exists
        let calendar = FakeCalendar {
            events: vec![series("mwf", "2016-04-18T12:20:00Z")],
            ..FakeCalendar::default()
        };
        let calls = calendar.calls.clone();
        let auth = FakeAuth {
            calendar: Some(calendar),
        };
        let feed = feed(vec![source("a", "2016-04-19T05:20:00Z", "A")]);

        let report = run_cycle(&auth, &feed, &options()).await.unwrap();

        assert!(report.class(DayClass::TueThu).unwrap().skipped());
        assert!(report.class(DayClass::Sat).unwrap().skipped());
        assert!(calls.updates.lock().unwrap().is_empty());
        // the Monday series has no feed events, so no instance query either
        assert!(calls.instances.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_instance_query_uses_compensated_window() {
        let calendar = tue_thu_calendar("old");
        let calls = calendar.calls.clone();
        let auth = FakeAuth {
            calendar: Some(calendar),
        };
        let feed = feed(vec![
            source("a", "2016-04-19T05:20:00Z", "A"),
            source("b", "2016-04-21T05:20:00Z", "B"),
        ]);

        run_cycle(&auth, &feed, &options()).await.unwrap();

        let queries = calls.instances.lock().unwrap();
        assert_eq!(queries.len(), 1);
        let (series_id, window) = &queries[0];
        assert_eq!(series_id, "tt");
        let window = window.expect("bounded query");
        assert_eq!(window.min.to_rfc3339(), "2016-04-19T12:20:00+00:00");
        assert_eq!(window.max.to_rfc3339(), "2016-04-21T13:50:00+00:00");
    }

    #[tokio::test]
    async fn test_auth_failure_fetches_nothing() {
        let auth = FakeAuth { calendar: None };
        let feed = feed(vec![source("a", "2016-04-19T05:20:00Z", "A")]);

        let result = run_cycle(&auth, &feed, &options()).await;

        assert!(matches!(result, Err(SyncError::Auth(_))));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_update_fails_the_cycle_after_siblings_complete() {
        let mut calendar = tue_thu_calendar("old");
        calendar.instances.insert(
            "tt".to_string(),
            vec![
                instance("x1", "2016-04-19T12:20:00Z", "old"),
                instance("x2", "2016-04-21T12:20:00Z", "old"),
            ],
        );
        calendar.failing_update = Some("x1".to_string());
        let calls = calendar.calls.clone();
        let auth = FakeAuth {
            calendar: Some(calendar),
        };
        let feed = feed(vec![
            source("a", "2016-04-19T05:20:00Z", "A"),
            source("b", "2016-04-21T05:20:00Z", "B"),
        ]);

        let result = run_cycle(&auth, &feed, &options()).await;

        match result {
            Err(SyncError::Update { event_id, .. }) => assert_eq!(event_id, "x1"),
            other => panic!("expected update error, got {other:?}"),
        }
        let updates = calls.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "x2");
    }

    #[tokio::test]
    async fn test_notifications_can_be_disabled() {
        let calendar = tue_thu_calendar("old");
        let calls = calendar.calls.clone();
        let auth = FakeAuth {
            calendar: Some(calendar),
        };
        let feed = feed(vec![source("a", "2016-04-19T05:20:00Z", "A")]);
        let options = SyncOptions {
            notify_attendees: false,
            ..options()
        };

        run_cycle(&auth, &feed, &options).await.unwrap();

        assert!(!calls.updates.lock().unwrap()[0].2);
    }

    #[tokio::test]
    async fn test_series_conflict_is_reported() {
        let calendar = FakeCalendar {
            events: vec![
                series("thursday", "2016-04-14T12:20:00Z"),
                series("tuesday", "2016-04-12T12:20:00Z"),
            ],
            ..FakeCalendar::default()
        };
        let auth = FakeAuth {
            calendar: Some(calendar),
        };
        let feed = feed(vec![source("a", "2016-04-19T05:20:00Z", "A")]);

        let report = run_cycle(&auth, &feed, &options()).await.unwrap();

        let tue_thu = report.class(DayClass::TueThu).unwrap();
        assert_eq!(tue_thu.series_id.as_deref(), Some("tuesday"));
        assert_eq!(
            tue_thu.series_conflict,
            Some(SeriesConflict {
                selected: "tuesday".into(),
                passed_over: vec!["thursday".into()],
            })
        );
        assert_eq!(report.conflicts(), 1);
    }
}
