//! Error types for cf-ddns.

use std::fmt;
use thiserror::Error;

/// Result type alias for cf-ddns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Missing or invalid invocation arguments / config file values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No candidate suffix of the hostname is an active Cloudflare zone.
    #[error(
        "No active Cloudflare zone found for {hostname} (tried: {}); \
         check that the domain is managed by Cloudflare and that the token has Zone:Read access{}",
        .tried.join(", "),
        .last_error.as_ref().map(|e| format!("; last error: {}", e)).unwrap_or_default()
    )]
    ZoneNotFound {
        hostname: String,
        tried: Vec<String>,
        /// Most recent failed lookup, if any candidate errored rather than
        /// answering with no zones.
        last_error: Option<ApiError>,
    },

    /// The A record could not be looked up or created at startup.
    #[error("Could not set up A record for {hostname}: {reason}")]
    RecordSetup { hostname: String, reason: String },

    /// Every public IP source failed.
    #[error("IP detection failed: {0}")]
    IpDetection(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failed Cloudflare API exchange.
///
/// Carries enough of the exchange to diagnose it from a log line: which
/// endpoint was called, the HTTP status if one was received, and the raw
/// response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Method and path, e.g. `PUT /zones/abc/dns_records/def`.
    pub endpoint: String,
    /// HTTP status, `None` when the request never got a response.
    pub status: Option<u16>,
    /// Raw response body (empty for transport failures).
    pub body: String,
    /// Short description of what went wrong.
    pub message: String,
}

impl ApiError {
    pub(crate) fn transport(endpoint: &str, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: None,
            body: String::new(),
            message: message.into(),
        }
    }

    pub(crate) fn response(
        endpoint: &str,
        status: u16,
        body: String,
        message: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: Some(status),
            body,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cloudflare API error at {}", self.endpoint)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        write!(f, ": {}", self.message)?;
        if !self.body.is_empty() {
            write!(f, "; body: {}", self.body)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}
