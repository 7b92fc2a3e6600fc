//! Ingestion pipeline: drains the watch channel one event at a time and
//! drives create-asset, upload-master, attach-to-album for each photo.
//!
//! Events are handled strictly in arrival order and never concurrently. A
//! failed event is logged and counted; the pipeline then returns to idle and
//! takes the next one. On shutdown the event in flight is allowed to finish.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::IngestTarget;
use crate::lightroom::{LightroomClient, LightroomError};
use crate::systemd::SystemdNotifier;
use crate::watch::IngestEvent;

/// The remote operations the pipeline needs.
#[async_trait::async_trait]
pub trait AssetSink: Send + Sync {
    async fn upload_photo(&self, catalog_id: &str, path: &Path) -> Result<String, LightroomError>;

    async fn add_asset_to_album(
        &self,
        catalog_id: &str,
        album_id: &str,
        asset_id: &str,
    ) -> Result<(), LightroomError>;
}

#[async_trait::async_trait]
impl AssetSink for LightroomClient {
    async fn upload_photo(&self, catalog_id: &str, path: &Path) -> Result<String, LightroomError> {
        LightroomClient::upload_photo(self, catalog_id, path).await
    }

    async fn add_asset_to_album(
        &self,
        catalog_id: &str,
        album_id: &str,
        asset_id: &str,
    ) -> Result<(), LightroomError> {
        LightroomClient::add_asset_to_album(self, catalog_id, album_id, asset_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Processing,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub ingested: u64,
    pub failed: u64,
}

/// How long to wait for a freshly created file to stop growing.
#[derive(Debug, Clone, Copy)]
pub struct SettleConfig {
    pub interval: Duration,
    pub max_checks: u32,
}

impl SettleConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_checks: 20,
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }
}

/// Wait until two consecutive size reads of `path` agree, or the check
/// budget runs out. Fails if the file disappears.
pub async fn wait_until_settled(path: &Path, settle: &SettleConfig) -> std::io::Result<()> {
    if settle.interval.is_zero() {
        return Ok(());
    }
    let mut last = tokio::fs::metadata(path).await?.len();
    for _ in 0..settle.max_checks {
        tokio::time::sleep(settle.interval).await;
        let current = tokio::fs::metadata(path).await?.len();
        if current == last {
            return Ok(());
        }
        last = current;
    }
    tracing::debug!(
        "{} still growing after {} checks, uploading anyway",
        path.display(),
        settle.max_checks
    );
    Ok(())
}

pub struct Pipeline<S> {
    sink: S,
    target: IngestTarget,
    settle: SettleConfig,
    notifier: SystemdNotifier,
    state: PipelineState,
    stats: PipelineStats,
}

impl<S: AssetSink> Pipeline<S> {
    pub fn new(sink: S, target: IngestTarget, settle: SettleConfig) -> Self {
        Self {
            sink,
            target,
            settle,
            notifier: SystemdNotifier::new(false),
            state: PipelineState::Idle,
            stats: PipelineStats::default(),
        }
    }

    pub(crate) fn with_notifier(mut self, notifier: SystemdNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Consume events until the channel closes or `shutdown` fires.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<IngestEvent>,
        shutdown: CancellationToken,
    ) -> PipelineStats {
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, no longer accepting new photos");
                    break;
                }
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => {
                        tracing::debug!("Event channel closed");
                        break;
                    }
                },
            };
            self.process(event).await;
        }
        rx.close();
        let dropped = std::iter::from_fn(|| rx.try_recv().ok()).count();
        if dropped > 0 {
            tracing::info!(dropped, "Photos left unprocessed at shutdown");
        }
        self.stats
    }

    async fn process(&mut self, event: IngestEvent) {
        self.state = PipelineState::Processing;
        let path = event.path;
        tracing::info!(state = ?self.state, "Ingesting {}", path.display());

        match self.ingest(&path).await {
            Ok(asset_id) => {
                self.stats.ingested += 1;
                tracing::info!(asset_id = %asset_id, "Added {} to album", path.display());
                self.notifier.notify_status(&format!(
                    "Ingested {} photo(s), last: {}",
                    self.stats.ingested,
                    path.display()
                ));
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::warn!("Failed to ingest {}: {}", path.display(), e);
            }
        }

        self.state = PipelineState::Idle;
    }

    async fn ingest(&self, path: &Path) -> Result<String, LightroomError> {
        wait_until_settled(path, &self.settle).await?;
        let asset_id = self.sink.upload_photo(&self.target.catalog_id, path).await?;
        self.sink
            .add_asset_to_album(&self.target.catalog_id, &self.target.album_id, &asset_id)
            .await?;
        Ok(asset_id)
    }
}
