use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::Syncer;
use crate::config::SyncConfig;
use crate::scheduler::{Schedule, supervise};

pub async fn run(config: &SyncConfig) -> Result<()> {
    let syncer = Arc::new(Syncer::from_config(config)?);
    let schedule = Schedule {
        interval: config.schedule.interval,
        jitter: config.schedule.jitter,
    };

    info!(
        interval = %humantime::format_duration(schedule.interval),
        jitter = %humantime::format_duration(schedule.jitter),
        "starting sync loop"
    );

    let cycle = move || {
        let syncer = syncer.clone();
        async move { syncer.run().await.map(|_| ()) }
    };

    let shutdown = async {
        // Without a signal handler the loop runs until the process is killed
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    supervise(schedule, cycle, shutdown).await;
    Ok(())
}
