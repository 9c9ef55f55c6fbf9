pub mod once;
pub mod run_loop;

use anyhow::{Context, Result};
use calsync_core::{CycleReport, SyncOptions, run_cycle};
use calsync_google::GoogleConnector;
use tracing::info;

use crate::config::SyncConfig;
use crate::feed::HttpFeed;

/// Everything one cycle needs, built once from the config.
pub struct Syncer {
    connector: GoogleConnector,
    feed: HttpFeed,
    options: SyncOptions,
}

impl Syncer {
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let connector = GoogleConnector::new(
            config.google.credentials.clone(),
            config.calendar_id.clone(),
            config.endpoints()?,
            config.http_timeout,
        )
        .context("Failed to set up Google Calendar client")?;

        let feed = HttpFeed::new(&config.feed_url, config.http_timeout)?;

        Ok(Syncer {
            connector,
            feed,
            options: config.sync_options()?,
        })
    }

    pub async fn run(&self) -> Result<CycleReport> {
        let report = run_cycle(&self.connector, &self.feed, &self.options)
            .await
            .context("Sync cycle failed")?;

        info!(
            updated = report.updated(),
            conflicts = report.conflicts(),
            "{}",
            report
        );
        Ok(report)
    }
}
