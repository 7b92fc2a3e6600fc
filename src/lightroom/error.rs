use thiserror::Error;

/// Errors raised while talking to Lightroom or the IMS token service.
#[derive(Debug, Error)]
pub enum LightroomError {
    /// The access token was rejected. Recoverable once per call by refreshing.
    #[error("Access token rejected (HTTP 401) by {url}")]
    AuthExpired { url: String },

    /// The token was rejected again right after a refresh.
    #[error("Authentication failed for {url}: token rejected after refresh")]
    AuthFailure { url: String },

    #[error("Token refresh failed (HTTP {status}): {body}")]
    TokenRefresh { status: u16, body: String },

    #[error("API error (HTTP {status}) from {url}: {body}")]
    Remote {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Malformed response from {context}: {source}")]
    MalformedResponse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No album named '{name}' in catalog {catalog_id}")]
    AlbumNotFound { name: String, catalog_id: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LightroomError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, LightroomError::AuthExpired { .. })
    }

    /// Turn a lingering `AuthExpired` into the fatal `AuthFailure`.
    pub fn escalate(self) -> Self {
        match self {
            LightroomError::AuthExpired { url } => LightroomError::AuthFailure { url },
            other => other,
        }
    }
}
