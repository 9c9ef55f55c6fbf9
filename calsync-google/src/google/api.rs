use async_trait::async_trait;
use calsync_core::{CalendarClient, DestinationEvent, Page, SyncError, SyncResult, Window};
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::session::Session;

/// Events of one Google calendar, accessed with an authenticated session.
pub struct GoogleCalendar {
    http: reqwest::Client,
    session: Session,
    calendar_id: String,
    api_base: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsResponse {
    #[serde(default)]
    items: Vec<Value>,
    next_page_token: Option<String>,
}

impl GoogleCalendar {
    pub fn new(
        http: reqwest::Client,
        session: Session,
        calendar_id: String,
        api_base: Url,
    ) -> Self {
        GoogleCalendar {
            http,
            session,
            calendar_id,
            api_base,
        }
    }

    /// `{api_base}/calendars/{calendar_id}/events/{rest...}`, each segment escaped.
    fn events_url(&self, rest: &[&str]) -> SyncResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("Invalid API base URL: {}", self.api_base)))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"])
            .extend(rest);
        Ok(url)
    }

    async fn get_page(&self, url: Url, query: &[(&str, String)]) -> SyncResult<Page> {
        debug!(url = %url, "GET request");

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(self.session.access_token())
            .query(query)
            .send()
            .await
            .map_err(|e| SyncError::Fetch(format!("Google API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::Fetch(format!(
                "Google API error ({}) for {}: {}",
                status, url, error_text
            )));
        }

        let body: EventsResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Fetch(format!("Failed to parse Google response: {}", e)))?;

        let items = body
            .items
            .into_iter()
            .map(DestinationEvent::from_json)
            .collect::<SyncResult<Vec<_>>>()?;

        Ok(Page {
            items,
            next_page_token: body.next_page_token,
        })
    }
}

fn page_query(page_token: Option<&str>) -> Vec<(&'static str, String)> {
    page_token
        .map(|token| ("pageToken", token.to_string()))
        .into_iter()
        .collect()
}

#[async_trait]
impl CalendarClient for GoogleCalendar {
    async fn list_events_page(&self, page_token: Option<&str>) -> SyncResult<Page> {
        let url = self.events_url(&[])?;
        self.get_page(url, &page_query(page_token)).await
    }

    async fn instances_page(
        &self,
        series_id: &str,
        window: Option<&Window>,
        page_token: Option<&str>,
    ) -> SyncResult<Page> {
        let url = self.events_url(&[series_id, "instances"])?;

        let mut query = page_query(page_token);
        if let Some(window) = window {
            query.push((
                "timeMin",
                window.min.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
            query.push((
                "timeMax",
                window
                    .exclusive_end()
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        self.get_page(url, &query).await
    }

    async fn update_event(
        &self,
        event: &DestinationEvent,
        notify_attendees: bool,
    ) -> SyncResult<()> {
        let url = self.events_url(&[event.id()])?;
        let send_updates = if notify_attendees { "all" } else { "none" };

        let response = self
            .http
            .put(url)
            .bearer_auth(self.session.access_token())
            .query(&[("sendUpdates", send_updates)])
            .json(event.body())
            .send()
            .await
            .map_err(|e| SyncError::update(event.id(), e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::update(
                event.id(),
                format!("Google API error ({}): {}", status, error_text),
            ));
        }

        Ok(())
    }
}
