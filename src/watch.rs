//! Directory watch feeding the ingestion pipeline.
//!
//! `notify` delivers events on its own thread; each one is reduced to an
//! [`FsEvent`], filtered, and pushed onto a single-consumer channel so the
//! pipeline sees eligible files strictly in arrival order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use notify::event::{CreateKind, EventKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

const PHOTO_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
    Removed,
    Other,
}

/// A filesystem notification reduced to what the filter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// A newly created photo waiting to be ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestEvent {
    pub path: PathBuf,
}

pub fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PHOTO_EXTENSION))
}

/// Only newly created, non-directory `.jpg` files (any case) are ingested.
pub fn accept(event: &FsEvent) -> Option<IngestEvent> {
    if event.kind != FsEventKind::Created || event.is_dir || !is_photo(&event.path) {
        return None;
    }
    Some(IngestEvent {
        path: event.path.clone(),
    })
}

fn translate(event: notify::Event) -> Vec<FsEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => FsEventKind::Created,
        EventKind::Modify(_) => FsEventKind::Modified,
        EventKind::Remove(_) => FsEventKind::Removed,
        _ => FsEventKind::Other,
    };
    let folder = match event.kind {
        EventKind::Create(CreateKind::Folder) => Some(true),
        EventKind::Create(CreateKind::File) => Some(false),
        _ => None,
    };
    event
        .paths
        .into_iter()
        .map(|path| {
            let is_dir = folder.unwrap_or_else(|| path.is_dir());
            FsEvent { kind, path, is_dir }
        })
        .collect()
}

/// Routes one raw `notify` event: eligible files go onto the channel, the
/// rest bump `ignored`.
fn dispatch(event: notify::Event, tx: &mpsc::Sender<IngestEvent>, ignored: &AtomicU64) {
    for fs_event in translate(event) {
        match accept(&fs_event) {
            Some(ingest) => {
                tracing::debug!("Queued {}", ingest.path.display());
                if tx.blocking_send(ingest).is_err() {
                    tracing::debug!("Pipeline stopped, dropping event");
                }
            }
            None => {
                ignored.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(?fs_event, "Ignored event");
            }
        }
    }
}

/// Keeps the OS watch alive; dropping it stops delivery and releases the
/// watch, which also drops the channel sender.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    directory: PathBuf,
    ignored: Arc<AtomicU64>,
}

impl DirectoryWatcher {
    pub fn start(directory: &Path, tx: mpsc::Sender<IngestEvent>) -> anyhow::Result<Self> {
        let ignored = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ignored);
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => dispatch(event, &tx, &counter),
                Err(e) => tracing::warn!("Watch error: {}", e),
            })
            .context("Failed to create filesystem watcher")?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", directory.display()))?;
        tracing::info!("Watching {} for new photos", directory.display());

        Ok(Self {
            _watcher: watcher,
            directory: directory.to_path_buf(),
            ignored,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Filesystem events seen so far that did not qualify for ingestion.
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }
}
