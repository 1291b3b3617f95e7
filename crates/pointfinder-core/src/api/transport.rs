//! Raw HTTP exchange with the game server

use super::routes;
use super::types::RefreshRequest;
use crate::auth::{RefreshedTokens, TokenRefresher};
use crate::config::ClientConfig;
use crate::error::{PointfinderError, PointfinderResult};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Body of an [`ApiRequest`]
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Vec<u8>),
    Octets(Vec<u8>),
}

/// A request that can be sent more than once (e.g. after a token refresh)
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub idempotency_key: Option<Uuid>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            idempotency_key: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, RequestBody::Empty)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path, RequestBody::Empty)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path, RequestBody::Empty)
    }

    pub fn post_json<T: Serialize>(path: impl Into<String>, body: &T) -> PointfinderResult<Self> {
        Ok(Self::new(
            Method::POST,
            path,
            RequestBody::Json(serde_json::to_vec(body)?),
        ))
    }

    pub fn put_octets(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(Method::PUT, path, RequestBody::Octets(bytes))
    }

    pub fn with_idempotency_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// reqwest client bound to the configured server
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
    min_upload_bytes_per_sec: u64,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> PointfinderResult<Self> {
        let base_url = Url::parse(config.api_base_url.trim())?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.http.connect_timeout)
            .user_agent(config.http.user_agent.clone())
            .build()
            .map_err(|e| {
                PointfinderError::config_with_context(e.to_string(), "Building HTTP client")
            })?;
        Ok(Self {
            client,
            base_url,
            request_timeout: config.http.request_timeout,
            min_upload_bytes_per_sec: config.http.min_upload_bytes_per_sec.max(1),
        })
    }

    /// Total deadline for `request`
    ///
    /// Chunk uploads get extra time in proportion to their size so a slow
    /// link can still finish them.
    pub fn deadline(&self, request: &ApiRequest) -> Duration {
        match &request.body {
            RequestBody::Octets(bytes) => {
                let secs = (bytes.len() as u64).div_ceil(self.min_upload_bytes_per_sec);
                self.request_timeout + Duration::from_secs(secs)
            }
            RequestBody::Empty | RequestBody::Json(_) => self.request_timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an API path, keeping any path prefix of the base URL
    pub fn endpoint(&self, path: &str) -> PointfinderResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}{}", base, path))?)
    }

    /// Send `request` and return the body of a 2xx response
    ///
    /// Failures before a status line arrives are [`PointfinderError::Network`];
    /// any other status is [`PointfinderError::Http`].
    pub async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> PointfinderResult<Vec<u8>> {
        let url = self.endpoint(&request.path)?;
        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .timeout(self.deadline(request));
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key.to_string());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            RequestBody::Octets(bytes) => builder
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes.clone()),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| PointfinderError::network_with_url(e.to_string(), url.as_str()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PointfinderError::network_with_url(e.to_string(), url.as_str()))?;

        tracing::debug!(method = %request.method, url = %url, status = status.as_u16(), "api response");

        if !status.is_success() {
            let message = error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(PointfinderError::http_status(
                status.as_u16(),
                message,
                Some(url.to_string()),
            ));
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl TokenRefresher for HttpTransport {
    async fn refresh(&self, refresh_token: &str) -> PointfinderResult<RefreshedTokens> {
        let request = ApiRequest::post_json(routes::REFRESH, &RefreshRequest { refresh_token })?;
        let body = self.send(&request, None).await?;
        decode(&body, "refresh response")
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8], what: &str) -> PointfinderResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| PointfinderError::json_with_context(e.to_string(), format!("Decoding {}", what)))
}

/// Human-readable message out of an error body
fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(200).collect())
    }
}
