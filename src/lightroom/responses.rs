use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::LightroomError;

/// Decode a JSON body, tolerating the `while (1) {}` guard line Lightroom
/// prepends to some responses.
pub fn parse_json<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, LightroomError> {
    match serde_json::from_str(body) {
        Ok(v) => Ok(v),
        Err(first) => {
            let Some((_, rest)) = body.split_once('\n') else {
                return Err(LightroomError::MalformedResponse {
                    context: context.to_string(),
                    source: first,
                });
            };
            serde_json::from_str(rest).map_err(|source| LightroomError::MalformedResponse {
                context: context.to_string(),
                source,
            })
        }
    }
}

/// Response from the IMS token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// IMS may rotate the refresh token; absent means keep the current one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Response shape shared by `/account` and `/catalog`.
#[derive(Debug, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct AlbumsResponse {
    #[serde(default)]
    pub resources: Vec<AlbumResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: AlbumPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumPayload {
    #[serde(default)]
    pub name: Option<String>,
}

impl AlbumResource {
    pub fn name(&self) -> Option<&str> {
        self.payload.name.as_deref()
    }
}

/// Body of `PUT /catalogs/{id}/assets/{asset_id}`.
#[derive(Debug, Serialize)]
pub struct CreateAssetRequest<'a> {
    pub subtype: &'a str,
    pub payload: CreateAssetPayload<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetPayload<'a> {
    pub capture_date: &'a str,
    pub import_source: ImportSource<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSource<'a> {
    pub file_name: &'a str,
    pub imported_on_device: &'a str,
    pub imported_by: &'a str,
    pub import_timestamp: &'a str,
}

/// Body of `PUT /catalogs/{id}/albums/{album_id}/assets`.
#[derive(Debug, Serialize)]
pub struct AlbumAssetsRequest<'a> {
    pub resources: Vec<AlbumAssetResource<'a>>,
}

#[derive(Debug, Serialize)]
pub struct AlbumAssetResource<'a> {
    pub id: &'a str,
    pub payload: AlbumAssetPayload,
}

#[derive(Debug, Serialize)]
pub struct AlbumAssetPayload {
    pub cover: bool,
}
