//! Client identity plus the current access/refresh token pair.
//!
//! The token pair sits behind an async mutex so "refresh, then retry with the
//! fresh token" stays atomic even if callers ever run concurrently. When a
//! token file is configured, every rotated refresh token is written to it so
//! a restart does not reuse a token IMS has already retired.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use super::error::LightroomError;

pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct TokenFile {
    refresh_token: String,
}

#[derive(Debug)]
pub struct CredentialStore {
    client_id: String,
    inner: Mutex<Credentials>,
    token_file: Option<PathBuf>,
}

impl CredentialStore {
    pub fn new(client_id: &str, client_secret: &str, refresh_token: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            inner: Mutex::new(Credentials {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                access_token: None,
                refresh_token: refresh_token.to_string(),
            }),
            token_file: None,
        }
    }

    /// Persist rotated refresh tokens to `path`. A token already stored
    /// there is newer than the configured one and replaces it.
    pub async fn with_token_file(mut self, path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => match serde_json::from_str::<TokenFile>(&contents) {
                Ok(stored) if !stored.refresh_token.is_empty() => {
                    tracing::debug!("Loaded refresh token from {}", path.display());
                    self.inner.get_mut().refresh_token = stored.refresh_token;
                }
                Ok(_) => tracing::warn!("Token file {} is empty, ignoring", path.display()),
                Err(e) => tracing::warn!("Token file {} is corrupt, ignoring: {}", path.display(), e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Token file {} does not exist yet", path.display());
            }
            Err(e) => tracing::warn!("Failed to read token file {}: {}", path.display(), e),
        }
        self.token_file = Some(path.to_path_buf());
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Exclusive access to the token pair.
    pub async fn lock(&self) -> MutexGuard<'_, Credentials> {
        self.inner.lock().await
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.lock().await.access_token.clone()
    }

    #[cfg(test)]
    pub async fn refresh_token(&self) -> String {
        self.inner.lock().await.refresh_token.clone()
    }

    /// Install the result of a successful refresh. Must be called with the
    /// guard obtained from [`CredentialStore::lock`].
    ///
    /// The server has already rotated the refresh token by now, so memory
    /// always takes the new pair. A failed token file write only costs the
    /// token across restarts and is logged rather than returned.
    pub async fn store_refreshed(
        &self,
        creds: &mut Credentials,
        access_token: String,
        refresh_token: Option<String>,
    ) {
        creds.access_token = Some(access_token);
        if let Some(rt) = refresh_token {
            creds.refresh_token = rt;
        }
        if let Some(path) = &self.token_file {
            if let Err(e) = write_token_file(path, &creds.refresh_token).await {
                tracing::warn!("Failed to save refresh token to {}: {}", path.display(), e);
            }
        }
    }
}

async fn write_token_file(path: &Path, refresh_token: &str) -> Result<(), LightroomError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(&TokenFile {
        refresh_token: refresh_token.to_string(),
    })?;
    tokio::fs::write(path, json).await?;
    #[cfg(unix)]
    {
        // Token files grant account access; owner-only
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    tracing::debug!("Saved refresh token to {}", path.display());
    Ok(())
}
