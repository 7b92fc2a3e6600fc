use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use super::error::LightroomError;

/// Request body variants the client needs.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(&'static str, String)>),
    Bytes {
        content_type: &'static str,
        data: Vec<u8>,
    },
}

/// A fully built HTTP request, independent of the transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

/// Status and raw body of a response. The body is kept as text because
/// Lightroom may prefix JSON with a guard line.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport used by the API client.
/// The production implementation is `reqwest::Client`.
#[async_trait::async_trait]
pub trait LightroomSession: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, LightroomError>;
}

#[async_trait::async_trait]
impl LightroomSession for reqwest::Client {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, LightroomError> {
        tracing::debug!("{} {}", request.method, request.url);
        let mut builder = self.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Bytes { content_type, data } => {
                builder.header(CONTENT_TYPE, content_type).body(data)
            }
        };
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}

/// Build the production HTTP client. `None` means requests never time out.
pub fn http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, LightroomError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("lrwatch/", env!("CARGO_PKG_VERSION")));
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(std::time::Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}
