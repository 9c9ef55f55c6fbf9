//! Seams to the outside world: identity, the calendar API and the feed.
//!
//! The cycle in `sync` only talks to these traits, so each adapter can be
//! swapped for an in-memory fake.

use std::future::Future;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::event::{DestinationEvent, SourceEvent};
use crate::window::Window;

/// One page of a list response.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<DestinationEvent>,
    /// Continuation token; `None` on the last page.
    pub next_page_token: Option<String>,
}

/// Read/write access to the events of one calendar.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// One page of the calendar's events (series definitions, not expanded).
    async fn list_events_page(&self, page_token: Option<&str>) -> SyncResult<Page>;

    /// One page of the instances of a recurring series, optionally bounded by `window`.
    async fn instances_page(
        &self,
        series_id: &str,
        window: Option<&Window>,
        page_token: Option<&str>,
    ) -> SyncResult<Page>;

    /// Replace an event with `event`'s full body.
    async fn update_event(&self, event: &DestinationEvent, notify_attendees: bool)
    -> SyncResult<()>;
}

/// Obtains an authenticated calendar client. Called once per cycle.
#[async_trait]
pub trait Authenticator: Send + Sync {
    type Client: CalendarClient;

    async fn connect(&self) -> SyncResult<Self::Client>;
}

/// The feed events are read from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_events(&self) -> SyncResult<Vec<SourceEvent>>;
}

/// Every event of the calendar, pages concatenated in order.
pub async fn list_all_events<C>(client: &C) -> SyncResult<Vec<DestinationEvent>>
where
    C: CalendarClient + ?Sized,
{
    follow_pages(|token| async move { client.list_events_page(token.as_deref()).await }).await
}

/// Every instance of a series within `window`, pages concatenated in order.
pub async fn list_all_instances<C>(
    client: &C,
    series_id: &str,
    window: Option<&Window>,
) -> SyncResult<Vec<DestinationEvent>>
where
    C: CalendarClient + ?Sized,
{
    follow_pages(|token| async move {
        client
            .instances_page(series_id, window, token.as_deref())
            .await
    })
    .await
}

/// Fetch pages one after another until no continuation token is returned.
async fn follow_pages<F, Fut>(mut fetch: F) -> SyncResult<Vec<DestinationEvent>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = SyncResult<Page>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = fetch(token.take()).await?;
        items.extend(page.items);

        match page.next_page_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => return Ok(items),
        }
    }
}
