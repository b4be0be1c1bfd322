//! Configuration management for cf-ddns.

use crate::client::DEFAULT_BASE_URL;
use crate::detector::DEFAULT_IP_SERVICES;
use crate::error::{DdnsError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings read from the optional config file.
///
/// Every field is optional so a file can supply only some of them; the
/// command line fills in or overrides the rest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Fully-qualified hostname to keep updated.
    pub hostname: Option<String>,

    /// API token (or environment variable name if prefixed with $).
    pub api_token: Option<String>,

    /// Check interval in seconds.
    pub interval_secs: Option<u64>,

    /// IP detection services, tried in order.
    pub ip_services: Option<Vec<String>>,

    /// Cloudflare API base URL.
    pub api_base_url: Option<String>,

    /// Directory holding the last-published-IP file.
    pub cache_dir: Option<PathBuf>,

    /// HTTP timeout in seconds for Cloudflare requests.
    pub http_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load from a specific path. A missing file yields an empty config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: FileConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub hostname: Option<String>,
    pub api_token: Option<String>,
    pub interval_secs: Option<u64>,
    pub cache_dir: Option<PathBuf>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub hostname: String,
    pub api_token: String,
    pub interval: Duration,
    pub ip_services: Vec<String>,
    pub api_base_url: String,
    pub cache_dir: PathBuf,
    pub http_timeout: Duration,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_ip_services() -> Vec<String> {
    DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect()
}

/// Default directory for the IP cache file.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("cf-ddns"))
        .unwrap_or_else(|| std::env::temp_dir().join("cf-ddns"))
}

/// Config file locations checked when none is given explicitly.
pub fn default_config_paths() -> Vec<PathBuf> {
    [
        dirs::config_dir().map(|p| p.join("cf-ddns/config.toml")),
        Some(PathBuf::from("/etc/cf-ddns/config.toml")),
        Some(PathBuf::from("config.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

impl Config {
    /// Merge file settings with command-line overrides and validate.
    pub fn resolve(file: FileConfig, cli: CliOverrides) -> Result<Self> {
        let hostname = cli
            .hostname
            .or(file.hostname)
            .map(|h| normalize_hostname(&h))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DdnsError::Config("missing hostname".to_string()))?;

        if hostname.split('.').count() < 2 {
            return Err(DdnsError::Config(format!(
                "hostname {} is not fully qualified",
                hostname
            )));
        }

        let api_token = cli
            .api_token
            .or(file.api_token)
            .map(|t| resolve_env(&t))
            .transpose()?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DdnsError::Config("missing API token".to_string()))?;

        let interval_secs = cli
            .interval_secs
            .or(file.interval_secs)
            .unwrap_or_else(default_interval_secs);
        if interval_secs == 0 {
            return Err(DdnsError::Config(
                "interval must be at least 1 second".to_string(),
            ));
        }

        let ip_services = file
            .ip_services
            .filter(|services| !services.is_empty())
            .unwrap_or_else(default_ip_services);

        let http_timeout_secs = file
            .http_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_http_timeout_secs);

        Ok(Self {
            hostname,
            api_token,
            interval: Duration::from_secs(interval_secs),
            ip_services,
            api_base_url: file
                .api_base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            cache_dir: cli
                .cache_dir
                .or(file.cache_dir)
                .unwrap_or_else(default_cache_dir),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

/// Lowercase, trim and drop a trailing root dot.
pub fn normalize_hostname(hostname: &str) -> String {
    hostname.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Resolve environment variable references (values starting with $).
pub fn resolve_env(value: &str) -> Result<String> {
    match value.strip_prefix('$') {
        Some(var_name) => std::env::var(var_name).map_err(|_| {
            DdnsError::Config(format!("environment variable {} is not set", var_name))
        }),
        None => Ok(value.to_string()),
    }
}
