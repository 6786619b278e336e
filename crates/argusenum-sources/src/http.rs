//! HTTP plumbing shared by every adapter: client construction, status and
//! transport error mapping, body excerpts, JSON decoding, credentials.

use std::time::Duration;

use argusenum_core::{CancelSignal, ConfigError, SourceError};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// User agent sent on every provider request.
pub const USER_AGENT: &str = concat!("argusenum/", env!("CARGO_PKG_VERSION"));

/// Upper bound on the response body quoted in a status error.
pub const EXCERPT_LIMIT: usize = 2048;

/// Client, base URL and time budget of one adapter. The budget is applied
/// to each request rather than baked into the client.
#[derive(Debug, Clone)]
pub struct Endpoint {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Endpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            client: client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `base_url` joined with `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

/// Build a client carrying the ArgusEnum user agent.
pub fn client() -> Result<Client, ConfigError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Read a credential from the environment. Blank values count as absent.
pub fn env_credential(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed body, cut to at most [`EXCERPT_LIMIT`] bytes on a char boundary.
pub fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.len() <= EXCERPT_LIMIT {
        return body.to_string();
    }
    let mut end = EXCERPT_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

pub fn transport_error(provider: &str, timeout: Duration, err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout {
            provider: provider.to_string(),
            after: timeout,
        }
    } else {
        SourceError::Transport {
            provider: provider.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Send `request` bounded by `timeout`, giving up early if `cancel` fires.
pub async fn send(
    provider: &str,
    timeout: Duration,
    cancel: &CancelSignal,
    request: RequestBuilder,
) -> Result<Response, SourceError> {
    tokio::select! {
        response = request.timeout(timeout).send() => {
            response.map_err(|e| transport_error(provider, timeout, e))
        }
        _ = cancel.cancelled() => Err(SourceError::Transport {
            provider: provider.to_string(),
            detail: "request cancelled".to_string(),
        }),
    }
}

/// Pass 2xx responses through; anything else becomes a status error
/// carrying a bounded excerpt of the body. No retries.
pub async fn ensure_success(provider: &str, response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Status {
        provider: provider.to_string(),
        status: status.as_u16(),
        excerpt: excerpt(&body),
    })
}

pub fn decode_json<T: DeserializeOwned>(provider: &str, body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Decode {
        provider: provider.to_string(),
        detail: e.to_string(),
    })
}

/// Send, check status and read the body as text.
pub async fn fetch_text(
    provider: &str,
    endpoint: &Endpoint,
    cancel: &CancelSignal,
    request: RequestBuilder,
) -> Result<String, SourceError> {
    let response = send(provider, endpoint.timeout(), cancel, request).await?;
    let response = ensure_success(provider, response).await?;
    response
        .text()
        .await
        .map_err(|e| transport_error(provider, endpoint.timeout(), e))
}

/// [`fetch_text`] followed by [`decode_json`].
pub async fn fetch_json<T: DeserializeOwned>(
    provider: &str,
    endpoint: &Endpoint,
    cancel: &CancelSignal,
    request: RequestBuilder,
) -> Result<T, SourceError> {
    let body = fetch_text(provider, endpoint, cancel, request).await?;
    decode_json(provider, &body)
}
