//! Authenticated JSON client for the Cloudflare v4 API.

use crate::error::ApiError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Cloudflare API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a single API exchange.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Thin wrapper over `reqwest` that adds bearer auth and decodes the
/// Cloudflare response envelope.
///
/// No retries happen here. A non-2xx status, an undecodable body or an
/// envelope with `success: false` all come back as an [`ApiError`] value.
#[derive(Clone)]
pub struct CloudflareClient {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CloudflareMessage>,
}

#[derive(Debug, Deserialize)]
struct CloudflareMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

impl CloudflareClient {
    /// Create a client against the public Cloudflare API.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self::with_base_url(api_token, DEFAULT_BASE_URL)
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_options(api_token, base_url, DEFAULT_TIMEOUT)
    }

    /// Create with a custom base URL and request timeout.
    pub fn with_options(
        api_token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_token: api_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `GET {base}{path}?{query}`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let request = self.request(Method::GET, path).query(query);
        self.send(request, format!("GET {}", path)).await
    }

    /// `POST {base}{path}` with a JSON body.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.request(Method::POST, path).json(body);
        self.send(request, format!("POST {}", path)).await
    }

    /// `PUT {base}{path}` with a JSON body.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.request(Method::PUT, path).json(body);
        self.send(request, format!("PUT {}", path)).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_token)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: String,
    ) -> ApiResult<T> {
        tracing::debug!("Cloudflare request: {}", endpoint);

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(&endpoint, format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ApiError::transport(&endpoint, format!("failed to read response body: {}", e))
        })?;

        let envelope: CloudflareResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                let message = if status.is_success() {
                    format!("invalid response: {}", e)
                } else {
                    format!("HTTP {}", status)
                };
                return Err(ApiError::response(&endpoint, status.as_u16(), body, message));
            }
        };

        if !status.is_success() || !envelope.success {
            let message = describe_errors(&envelope.errors);
            return Err(ApiError::response(&endpoint, status.as_u16(), body, message));
        }

        envelope.result.ok_or_else(|| {
            ApiError::response(&endpoint, status.as_u16(), body, "response has no result")
        })
    }
}

fn describe_errors(errors: &[CloudflareMessage]) -> String {
    if errors.is_empty() {
        return "request unsuccessful".to_string();
    }

    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}
