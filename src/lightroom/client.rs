//! Authenticated Lightroom API client.
//!
//! Every call carries `X-API-Key` and a bearer token. A 401 triggers one
//! token refresh followed by exactly one re-issue of the same request (see
//! [`crate::retry::retry_after_refresh`]). Any other non-2xx status is final.

use std::path::Path;

use reqwest::Method;
use uuid::Uuid;

use super::credentials::CredentialStore;
use super::endpoints::Endpoints;
use super::error::LightroomError;
use super::responses::{
    parse_json, AlbumAssetPayload, AlbumAssetResource, AlbumAssetsRequest, AlbumResource,
    AlbumsResponse, CreateAssetPayload, CreateAssetRequest, IdResponse, ImportSource,
    TokenResponse,
};
use super::session::{ApiRequest, ApiResponse, LightroomSession, RequestBody};
use crate::retry;

/// Lightroom requires a capture date on creation; the real one is read
/// from EXIF once the master is uploaded.
const PLACEHOLDER_CAPTURE_DATE: &str = "0000-00-00T00:00:00";
const MASTER_CONTENT_TYPE: &str = "image/jpeg";

/// Generate a client-side asset id: 32 lowercase hex characters.
pub fn new_asset_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub struct LightroomClient {
    session: Box<dyn LightroomSession>,
    endpoints: Endpoints,
    credentials: CredentialStore,
    device_name: String,
    account_id: String,
}

impl std::fmt::Debug for LightroomClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightroomClient")
            .field("endpoints", &self.endpoints)
            .field("account_id", &self.account_id)
            .field("device_name", &self.device_name)
            .finish_non_exhaustive()
    }
}

impl LightroomClient {
    /// Refresh the access token and resolve the account id.
    pub async fn connect(
        session: Box<dyn LightroomSession>,
        endpoints: Endpoints,
        credentials: CredentialStore,
        device_name: &str,
    ) -> Result<Self, LightroomError> {
        let mut client = Self {
            session,
            endpoints,
            credentials,
            device_name: device_name.to_string(),
            account_id: String::new(),
        };
        client.refresh_access_token().await?;
        client.account_id = client.fetch_account_id().await?;
        tracing::info!(account_id = %client.account_id, "Authenticated with Lightroom");
        Ok(client)
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    #[cfg(test)]
    pub(crate) fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Exchange the refresh token for a new token pair. Never retried: without
    /// a valid refresh token no further progress is possible.
    pub async fn refresh_access_token(&self) -> Result<(), LightroomError> {
        let mut creds = self.credentials.lock().await;
        let request = ApiRequest::new(Method::POST, self.endpoints.token_url.as_str()).body(
            RequestBody::Form(vec![
                ("client_id", creds.client_id.clone()),
                ("client_secret", creds.client_secret.clone()),
                ("refresh_token", creds.refresh_token.clone()),
                ("grant_type", "refresh_token".to_string()),
            ]),
        );
        let response = self.session.execute(request).await?;
        if !response.is_success() {
            return Err(LightroomError::TokenRefresh {
                status: response.status,
                body: response.body,
            });
        }
        let token: TokenResponse = parse_json(&response.body, "token endpoint")?;
        if let Some(expires_in) = token.expires_in {
            tracing::debug!(expires_in, "Access token refreshed");
        } else {
            tracing::debug!("Access token refreshed");
        }
        self.credentials
            .store_refreshed(&mut creds, token.access_token, token.refresh_token)
            .await;
        Ok(())
    }

    async fn bearer_token(&self) -> Result<String, LightroomError> {
        if let Some(token) = self.credentials.access_token().await {
            return Ok(token);
        }
        self.refresh_access_token().await?;
        self.credentials
            .access_token()
            .await
            .ok_or_else(|| LightroomError::TokenRefresh {
                status: 200,
                body: "no access token issued".to_string(),
            })
    }

    /// Issue one attempt of an authenticated request and classify the status.
    async fn send_once(&self, request: ApiRequest) -> Result<ApiResponse, LightroomError> {
        let token = self.bearer_token().await?;
        let url = request.url.clone();
        let request = request
            .header("X-API-Key", self.credentials.client_id())
            .header("Authorization", format!("Bearer {}", token));
        let response = self.session.execute(request).await?;
        match response.status {
            s if (200..300).contains(&s) => Ok(response),
            401 => Err(LightroomError::AuthExpired { url }),
            status => Err(LightroomError::Remote {
                status,
                url,
                body: response.body,
            }),
        }
    }

    /// Send the request produced by `build`, re-building and re-sending it once
    /// after a token refresh if the first attempt is rejected.
    async fn send_authenticated<B>(&self, build: B) -> Result<ApiResponse, LightroomError>
    where
        B: Fn() -> ApiRequest,
    {
        let build = &build;
        retry::retry_after_refresh(
            move || self.refresh_access_token(),
            move || self.send_once(build()),
        )
        .await
    }

    async fn fetch_account_id(&self) -> Result<String, LightroomError> {
        let url = self.endpoints.account();
        let response = self
            .send_authenticated(|| ApiRequest::new(Method::GET, url.as_str()))
            .await?;
        let account: IdResponse = parse_json(&response.body, "account")?;
        Ok(account.id)
    }

    /// Id of the catalog owned by the account.
    pub async fn get_catalog(&self) -> Result<String, LightroomError> {
        let url = self.endpoints.catalog();
        let response = self
            .send_authenticated(|| ApiRequest::new(Method::GET, url.as_str()))
            .await?;
        let catalog: IdResponse = parse_json(&response.body, "catalog")?;
        Ok(catalog.id)
    }

    pub async fn list_albums(&self, catalog_id: &str) -> Result<Vec<AlbumResource>, LightroomError> {
        let url = self.endpoints.albums(catalog_id);
        let response = self
            .send_authenticated(|| ApiRequest::new(Method::GET, url.as_str()))
            .await?;
        let albums: AlbumsResponse = parse_json(&response.body, "albums")?;
        Ok(albums.resources)
    }

    /// Create an image asset from `path` and upload its bytes as the master.
    ///
    /// The asset id is generated once, so a retried creation targets the same
    /// record. Returns the asset id once both phases have succeeded.
    pub async fn upload_photo(&self, catalog_id: &str, path: &Path) -> Result<String, LightroomError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let asset_id = new_asset_id();
        self.create_asset(catalog_id, &asset_id, &file_name).await?;
        tracing::debug!(asset_id = %asset_id, "Created asset record for {}", file_name);

        self.upload_master(catalog_id, &asset_id, &data).await?;
        tracing::debug!(asset_id = %asset_id, bytes = data.len(), "Uploaded master");

        Ok(asset_id)
    }

    async fn create_asset(
        &self,
        catalog_id: &str,
        asset_id: &str,
        file_name: &str,
    ) -> Result<(), LightroomError> {
        let url = self.endpoints.asset(catalog_id, asset_id);
        let import_timestamp = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        let body = serde_json::to_value(CreateAssetRequest {
            subtype: "image",
            payload: CreateAssetPayload {
                capture_date: PLACEHOLDER_CAPTURE_DATE,
                import_source: ImportSource {
                    file_name,
                    imported_on_device: &self.device_name,
                    imported_by: &self.account_id,
                    import_timestamp: &import_timestamp,
                },
            },
        })?;
        self.send_authenticated(|| {
            ApiRequest::new(Method::PUT, url.as_str()).body(RequestBody::Json(body.clone()))
        })
        .await?;
        Ok(())
    }

    async fn upload_master(
        &self,
        catalog_id: &str,
        asset_id: &str,
        data: &[u8],
    ) -> Result<(), LightroomError> {
        let url = self.endpoints.asset_master(catalog_id, asset_id);
        self.send_authenticated(|| {
            ApiRequest::new(Method::PUT, url.as_str()).body(RequestBody::Bytes {
                content_type: MASTER_CONTENT_TYPE,
                data: data.to_vec(),
            })
        })
        .await?;
        Ok(())
    }

    pub async fn add_asset_to_album(
        &self,
        catalog_id: &str,
        album_id: &str,
        asset_id: &str,
    ) -> Result<(), LightroomError> {
        let url = self.endpoints.album_assets(catalog_id, album_id);
        let body = serde_json::to_value(AlbumAssetsRequest {
            resources: vec![AlbumAssetResource {
                id: asset_id,
                payload: AlbumAssetPayload { cover: false },
            }],
        })?;
        let response = self
            .send_authenticated(|| {
                ApiRequest::new(Method::PUT, url.as_str()).body(RequestBody::Json(body.clone()))
            })
            .await?;
        tracing::debug!(asset_id, album_id, "Album attach response: {}", response.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::lightroom::session::testing::ScriptedSession;

    const TOKEN_URL: &str = "http://ims.test/token";

    fn endpoints() -> Endpoints {
        Endpoints::new("http://lr.test/v2", TOKEN_URL)
    }

    fn header<'a>(request: &'a ApiRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    fn form_value(request: &ApiRequest, key: &str) -> Option<String> {
        match &request.body {
            RequestBody::Form(pairs) => pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    async fn connect(session: &Arc<ScriptedSession>) -> LightroomClient {
        LightroomClient::connect(
            Box::new(session.clone()),
            endpoints(),
            CredentialStore::new("cid", "secret", "rt0"),
            "test-device",
        )
        .await
        .unwrap()
    }

    fn connected_script() -> ScriptedSession {
        ScriptedSession::new()
            .token("at1", "rt1")
            .respond(200, r#"{"id":"acct1"}"#)
    }

    fn photo_file(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"\xff\xd8\xff\xe0jpegdata").unwrap();
        path
    }

    #[test]
    fn test_new_asset_id_format() {
        let id = new_asset_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, new_asset_id());
    }

    #[tokio::test]
    async fn test_connect_refreshes_then_resolves_account() {
        let session = Arc::new(connected_script());
        let client = connect(&session).await;

        assert_eq!(client.account_id(), "acct1");
        let requests = session.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, TOKEN_URL);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(form_value(&requests[0], "grant_type").as_deref(), Some("refresh_token"));
        assert_eq!(form_value(&requests[0], "refresh_token").as_deref(), Some("rt0"));
        assert_eq!(form_value(&requests[0], "client_id").as_deref(), Some("cid"));
        assert_eq!(requests[1].url, "http://lr.test/v2/account");
        assert_eq!(header(&requests[1], "X-API-Key"), Some("cid"));
        assert_eq!(header(&requests[1], "Authorization"), Some("Bearer at1"));
    }

    #[tokio::test]
    async fn test_connect_fails_when_refresh_rejected() {
        let session = Arc::new(ScriptedSession::new().respond(400, "invalid_grant"));
        let err = LightroomClient::connect(
            Box::new(session.clone()),
            endpoints(),
            CredentialStore::new("cid", "secret", "rt0"),
            "test-device",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LightroomError::TokenRefresh { status: 400, .. }));
        assert_eq!(session.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_account_lookup_retries_after_401() {
        let session = Arc::new(
            ScriptedSession::new()
                .token("at1", "rt1")
                .respond(401, "")
                .token("at2", "rt2")
                .respond(200, r#"{"id":"acct1"}"#),
        );
        let client = connect(&session).await;
        assert_eq!(client.account_id(), "acct1");
        let requests = session.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(form_value(&requests[2], "refresh_token").as_deref(), Some("rt1"));
        assert_eq!(header(&requests[3], "Authorization"), Some("Bearer at2"));
    }

    #[tokio::test]
    async fn test_refresh_rotates_stored_refresh_token() {
        let session = Arc::new(
            connected_script()
                .respond(401, "")
                .token("at2", "rt2")
                .respond(200, r#"{"id":"cat1"}"#),
        );
        let client = connect(&session).await;
        assert_eq!(client.credentials().refresh_token().await, "rt1");

        assert_eq!(client.get_catalog().await.unwrap(), "cat1");
        assert_eq!(client.credentials().refresh_token().await, "rt2");
        assert_eq!(client.credentials().access_token().await.as_deref(), Some("at2"));
    }

    #[tokio::test]
    async fn test_second_401_is_auth_failure_without_second_refresh() {
        let session = Arc::new(connected_script().respond(401, "").token("at2", "rt2").respond(401, ""));
        let client = connect(&session).await;

        let err = client.get_catalog().await.unwrap_err();
        assert!(matches!(err, LightroomError::AuthFailure { .. }));
        let token_calls = session.urls().iter().filter(|u| *u == TOKEN_URL).count();
        assert_eq!(token_calls, 2);
        assert_eq!(session.requests().len(), 5);
    }

    #[tokio::test]
    async fn test_remote_error_is_not_retried() {
        let session = Arc::new(connected_script().respond(503, "unavailable"));
        let client = connect(&session).await;

        let err = client.get_catalog().await.unwrap_err();
        match err {
            LightroomError::Remote { status, body, url } => {
                assert_eq!(status, 503);
                assert_eq!(body, "unavailable");
                assert_eq!(url, "http://lr.test/v2/catalog");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_list_albums_with_guard_line() {
        let body = "while (1) {}\n{\"resources\":[{\"id\":\"a1\",\"type\":\"album\",\"payload\":{\"name\":\"Trip\"}}]}";
        let session = Arc::new(connected_script().respond(200, body));
        let client = connect(&session).await;

        let albums = client.list_albums("cat1").await.unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].id, "a1");
        assert_eq!(albums[0].name(), Some("Trip"));
        assert_eq!(session.urls()[2], "http://lr.test/v2/catalogs/cat1/albums");
    }

    #[tokio::test]
    async fn test_upload_photo_two_phases() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo_file(&dir, "IMG_0001.JPG");
        let session = Arc::new(connected_script().respond(201, "").respond(201, ""));
        let client = connect(&session).await;

        let asset_id = client.upload_photo("cat1", &path).await.unwrap();
        let requests = session.requests();
        assert_eq!(requests.len(), 4);

        let create = &requests[2];
        assert_eq!(create.method, Method::PUT);
        assert_eq!(create.url, format!("http://lr.test/v2/catalogs/cat1/assets/{}", asset_id));
        match &create.body {
            RequestBody::Json(v) => {
                assert_eq!(v["subtype"], "image");
                assert_eq!(v["payload"]["captureDate"], PLACEHOLDER_CAPTURE_DATE);
                assert_eq!(v["payload"]["importSource"]["fileName"], "IMG_0001.JPG");
                assert_eq!(v["payload"]["importSource"]["importedBy"], "acct1");
                assert_eq!(v["payload"]["importSource"]["importedOnDevice"], "test-device");
                assert!(v["payload"]["importSource"]["importTimestamp"].is_string());
            }
            other => panic!("unexpected body: {:?}", other),
        }

        let master = &requests[3];
        assert_eq!(
            master.url,
            format!("http://lr.test/v2/catalogs/cat1/assets/{}/master", asset_id)
        );
        match &master.body {
            RequestBody::Bytes { content_type, data } => {
                assert_eq!(*content_type, "image/jpeg");
                assert_eq!(data.as_slice(), b"\xff\xd8\xff\xe0jpegdata");
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_asset_retry_reuses_asset_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo_file(&dir, "a.jpg");
        let session = Arc::new(
            connected_script()
                .respond(401, "")
                .token("at2", "rt2")
                .respond(201, "")
                .respond(201, ""),
        );
        let client = connect(&session).await;

        let asset_id = client.upload_photo("cat1", &path).await.unwrap();
        let requests = session.requests();
        assert_eq!(requests.len(), 6);
        assert_eq!(requests[3].url, TOKEN_URL);
        assert_eq!(requests[2].url, requests[4].url);
        assert!(requests[4].url.ends_with(&asset_id));
        assert_eq!(header(&requests[2], "Authorization"), Some("Bearer at1"));
        assert_eq!(header(&requests[4], "Authorization"), Some("Bearer at2"));
        assert!(requests[5].url.ends_with(&format!("{}/master", asset_id)));
    }

    #[tokio::test]
    async fn test_master_upload_retries_after_401() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo_file(&dir, "a.jpg");
        let session = Arc::new(
            connected_script()
                .respond(201, "")
                .respond(401, "")
                .token("at2", "rt2")
                .respond(201, ""),
        );
        let client = connect(&session).await;

        let asset_id = client.upload_photo("cat1", &path).await.unwrap();
        let requests = session.requests();
        assert_eq!(requests.len(), 6);
        assert_eq!(requests[3].url, requests[5].url);
        assert!(requests[5].url.ends_with(&format!("{}/master", asset_id)));
        assert!(matches!(requests[5].body, RequestBody::Bytes { .. }));
    }

    #[tokio::test]
    async fn test_upload_fails_when_master_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo_file(&dir, "a.jpg");
        let session = Arc::new(connected_script().respond(201, "").respond(413, "too large"));
        let client = connect(&session).await;

        let err = client.upload_photo("cat1", &path).await.unwrap_err();
        assert!(matches!(err, LightroomError::Remote { status: 413, .. }));
    }

    #[tokio::test]
    async fn test_upload_missing_file_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(connected_script());
        let client = connect(&session).await;

        let err = client
            .upload_photo("cat1", &dir.path().join("gone.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, LightroomError::Io(_)));
        assert_eq!(session.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_add_asset_to_album() {
        let session = Arc::new(connected_script().respond(200, ""));
        let client = connect(&session).await;

        client.add_asset_to_album("cat1", "alb1", "asset1").await.unwrap();
        let request = &session.requests()[2];
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.url, "http://lr.test/v2/catalogs/cat1/albums/alb1/assets");
        match &request.body {
            RequestBody::Json(v) => assert_eq!(
                *v,
                serde_json::json!({"resources": [{"id": "asset1", "payload": {"cover": false}}]})
            ),
            other => panic!("unexpected body: {:?}", other),
        }
    }
}
