//! Google Calendar v3 over plain REST.
//!
//! Events are passed through as JSON so an update can send back every field
//! the API returned.

mod api;

use std::time::Duration;

use async_trait::async_trait;
use calsync_core::{Authenticator, SyncError, SyncResult};
use tracing::info;
use url::Url;

use crate::session::{GoogleCredentials, Session};

pub use api::GoogleCalendar;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Where the API and the token endpoint live.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_base: Url,
    pub token_url: Url,
}

impl Endpoints {
    pub fn new(api_base: &str, token_url: &str) -> SyncResult<Self> {
        let parse = |s: &str| {
            Url::parse(s).map_err(|e| SyncError::Config(format!("Invalid URL '{}': {}", s, e)))
        };

        Ok(Endpoints {
            api_base: parse(api_base)?,
            token_url: parse(token_url)?,
        })
    }
}

/// Builds an authenticated `GoogleCalendar` for one calendar.
pub struct GoogleConnector {
    http: reqwest::Client,
    credentials: GoogleCredentials,
    calendar_id: String,
    endpoints: Endpoints,
}

impl GoogleConnector {
    pub fn new(
        credentials: GoogleCredentials,
        calendar_id: impl Into<String>,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(GoogleConnector {
            http,
            credentials,
            calendar_id: calendar_id.into(),
            endpoints,
        })
    }
}

#[async_trait]
impl Authenticator for GoogleConnector {
    type Client = GoogleCalendar;

    async fn connect(&self) -> SyncResult<GoogleCalendar> {
        let session =
            Session::acquire(&self.http, &self.credentials, &self.endpoints.token_url).await?;
        info!(account = session.account(), "authenticated");

        Ok(GoogleCalendar::new(
            self.http.clone(),
            session,
            self.calendar_id.clone(),
            self.endpoints.api_base.clone(),
        ))
    }
}
