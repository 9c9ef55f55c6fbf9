use anyhow::Result;
use tracing::info;

use super::Syncer;
use crate::config::SyncConfig;

pub async fn run(config: &SyncConfig) -> Result<()> {
    let syncer = Syncer::from_config(config)?;
    syncer.run().await?;
    info!("sync success");
    Ok(())
}
