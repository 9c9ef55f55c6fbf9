//! Downloads the team-schedule feed.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use calsync_core::ics::parse_feed;
use calsync_core::{FeedSource, SourceEvent, SyncError, SyncResult};
use tracing::debug;

/// An iCal feed served over HTTP(S).
pub struct HttpFeed {
    http: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpFeed {
            http,
            url: normalize_feed_url(url),
        })
    }
}

/// `webcal://` is plain HTTPS as far as fetching goes.
fn normalize_feed_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch_events(&self) -> SyncResult<Vec<SourceEvent>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SyncError::Fetch(format!("Feed request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SyncError::Fetch(format!(
                "Feed {} returned {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Fetch(format!("Failed to read feed body: {}", e)))?;

        let events = parse_feed(&body)?;
        debug!(url = %self.url, events = events.len(), "fetched feed");
        Ok(events)
    }
}
