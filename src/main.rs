mod commands;
mod config;
mod feed;
mod scheduler;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::SyncConfig;

const DEFAULT_LOG_FILTER: &str = "calsync=info,calsync_core=info,calsync_google=info";

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "Copy team-schedule descriptions onto recurring Google Calendar events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync cycle; exits non-zero if it fails
    Once,
    /// Sync repeatedly on the configured interval until interrupted
    Loop,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match SyncConfig::load() {
        Ok(config) => match cli.command {
            Commands::Once => commands::once::run(&config).await,
            Commands::Loop => commands::run_loop::run(&config).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
