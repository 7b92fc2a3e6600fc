//! Polling mover: drains a drop directory (e.g. an SFTP share) into the
//! watch directory. Each file is copied, which the watcher sees as a new
//! file, and then removed from the source.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Move every regular file in `from` into `to`. Returns the number moved.
/// A file that fails to move is logged and left for the next pass.
pub async fn move_pending(from: &Path, to: &Path) -> std::io::Result<usize> {
    let mut entries = tokio::fs::read_dir(from).await?;
    let mut moved = 0;
    while let Some(entry) = entries.next_entry().await? {
        let source = entry.path();
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Cannot stat {}: {}", source.display(), e);
                continue;
            }
        }
        let dest = to.join(entry.file_name());
        match move_file(&source, &dest).await {
            Ok(()) => {
                tracing::info!("Moved {} to {}", source.display(), to.display());
                moved += 1;
            }
            Err(e) => tracing::warn!("Failed to move {}: {}", source.display(), e),
        }
    }
    Ok(moved)
}

async fn move_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    tokio::fs::copy(source, dest).await?;
    tokio::fs::remove_file(source).await
}

/// Run [`move_pending`] every `interval` until `shutdown` fires.
pub async fn run_mover(from: PathBuf, to: PathBuf, interval: Duration, shutdown: CancellationToken) {
    tracing::info!(
        "Moving files from {} every {}s",
        from.display(),
        interval.as_secs()
    );
    loop {
        if let Err(e) = move_pending(&from, &to).await {
            tracing::warn!("Failed to scan {}: {}", from.display(), e);
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.cancelled() => {
                tracing::debug!("Mover stopped");
                break;
            }
        }
    }
}
