//! Startup: authenticate, then resolve the catalog and target album once.
//! Every failure here is fatal; nothing can be ingested without them.

use anyhow::Context;

use crate::config::Config;
use crate::lightroom::{
    http_client, AlbumResource, CredentialStore, Endpoints, LightroomClient, LightroomError,
};

const ALBUM_TYPE: &str = "album";

/// Catalog and album every ingested photo goes to. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestTarget {
    pub catalog_id: String,
    pub album_id: String,
}

/// Build the HTTP client and credential store from `config`, then
/// authenticate (initial refresh + account lookup).
pub async fn connect(config: &Config) -> anyhow::Result<LightroomClient> {
    let mut credentials =
        CredentialStore::new(&config.client_id, &config.client_secret, &config.refresh_token);
    if let Some(path) = &config.token_file {
        credentials = credentials.with_token_file(path).await;
    }
    let session = http_client(config.request_timeout_secs)?;
    let client = LightroomClient::connect(
        Box::new(session),
        Endpoints::new(&config.api_base, &config.token_url),
        credentials,
        &config.device_name,
    )
    .await
    .context("Failed to authenticate with Lightroom")?;
    Ok(client)
}

/// The catalog endpoint returns the account's single catalog.
pub async fn resolve_catalog(client: &LightroomClient) -> Result<String, LightroomError> {
    let catalog_id = client.get_catalog().await?;
    tracing::debug!(catalog_id = %catalog_id, "Resolved catalog");
    Ok(catalog_id)
}

/// First album (type `album`) whose name matches `name` exactly.
pub fn select_album<'a>(albums: &'a [AlbumResource], name: &str) -> Option<&'a AlbumResource> {
    let mut matches = albums
        .iter()
        .filter(|a| a.kind == ALBUM_TYPE && a.name() == Some(name));
    let first = matches.next()?;
    let extra = matches.count();
    if extra > 0 {
        tracing::warn!(
            "{} albums are named '{}', using the first ({})",
            extra + 1,
            name,
            first.id
        );
    }
    Some(first)
}

pub async fn resolve_album(
    client: &LightroomClient,
    catalog_id: &str,
    name: &str,
) -> Result<String, LightroomError> {
    let albums = client.list_albums(catalog_id).await?;
    match select_album(&albums, name) {
        Some(album) => Ok(album.id.clone()),
        None => Err(LightroomError::AlbumNotFound {
            name: name.to_string(),
            catalog_id: catalog_id.to_string(),
        }),
    }
}

pub async fn resolve_target(
    client: &LightroomClient,
    album_name: &str,
) -> anyhow::Result<IngestTarget> {
    let catalog_id = resolve_catalog(client)
        .await
        .context("Failed to resolve catalog")?;
    let album_id = resolve_album(client, &catalog_id, album_name).await?;
    tracing::info!(
        account_id = %client.account_id(),
        catalog_id = %catalog_id,
        album_id = %album_id,
        "Target album '{}'",
        album_name
    );
    Ok(IngestTarget {
        catalog_id,
        album_id,
    })
}
