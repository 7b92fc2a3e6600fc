//! lrwatch: watch a directory and ingest new JPEGs into a Lightroom album.
//!
//! On startup the client refreshes its access token, resolves the account,
//! the catalog, and the target album. From then on each newly created `.jpg`
//! is uploaded as an asset (record first, then master bytes) and attached to
//! the album. Expired tokens are refreshed transparently, once per call.

#![warn(clippy::all)]

mod bootstrap;
mod cli;
mod config;
mod lightroom;
mod mover;
mod pipeline;
pub mod retry;
mod shutdown;
mod systemd;
mod types;
mod watch;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use pipeline::{Pipeline, SettleConfig};
use systemd::SystemdNotifier;
use watch::DirectoryWatcher;

/// Pending photos buffered between the watcher thread and the pipeline.
const EVENT_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Starting lrwatch");

    let shutdown_token = shutdown::install_signal_handler()?;
    let notifier = SystemdNotifier::new(config.notify_systemd);

    let client = bootstrap::connect(&config).await?;
    let target = bootstrap::resolve_target(&client, &config.album_name).await?;

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let watcher = DirectoryWatcher::start(&config.watch_directory, tx)?;

    let mover = config.import_from.clone().map(|from| {
        tokio::spawn(mover::run_mover(
            from,
            config.watch_directory.clone(),
            config.import_interval,
            shutdown_token.clone(),
        ))
    });

    notifier.notify_ready();

    let stats = Pipeline::new(client, target, SettleConfig::new(config.settle_interval))
        .with_notifier(notifier)
        .run(rx, shutdown_token.clone())
        .await;

    notifier.notify_stopping();
    tracing::info!("Stopped watching {}", watcher.directory().display());
    let ignored = watcher.ignored();
    drop(watcher);
    if let Some(handle) = mover {
        if let Err(e) = handle.await {
            tracing::warn!("Mover task failed: {}", e);
        }
    }

    tracing::info!(
        ingested = stats.ingested,
        failed = stats.failed,
        ignored,
        "Shutting down"
    );
    Ok(())
}
