//! Zone auto-detection.
//!
//! The zone that owns a hostname is found by asking Cloudflare about each
//! suffix of the hostname in turn, longest first, so the most specific
//! delegated zone wins when both `example.com` and `sub.example.com` are
//! managed separately.

use crate::client::CloudflareClient;
use crate::error::{DdnsError, Result};
use serde::Deserialize;

/// A Cloudflare-managed zone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// Resolves the managing zone of a hostname.
#[derive(Debug, Clone)]
pub struct ZoneResolver {
    client: CloudflareClient,
}

impl ZoneResolver {
    pub fn new(client: CloudflareClient) -> Self {
        Self { client }
    }

    /// Find the most specific active zone that contains `hostname`.
    pub async fn resolve_zone(&self, hostname: &str) -> Result<Zone> {
        let candidates = candidate_domains(hostname);

        let mut last_error = None;

        for candidate in &candidates {
            tracing::debug!("Checking zone candidate {}", candidate);

            let zones: Vec<Zone> = match self
                .client
                .get("/zones", &[("name", candidate.as_str()), ("status", "active")])
                .await
            {
                Ok(zones) => zones,
                Err(e) => {
                    tracing::warn!("Zone lookup for {} failed: {}", candidate, e);
                    last_error = Some(e);
                    continue;
                }
            };

            if let Some(zone) = zones.into_iter().next() {
                tracing::info!("Resolved zone {} ({}) for {}", zone.name, zone.id, hostname);
                return Ok(zone);
            }
        }

        Err(DdnsError::ZoneNotFound {
            hostname: hostname.to_string(),
            tried: candidates,
            last_error,
        })
    }
}

/// Suffixes of `hostname` to test as zone names, longest first.
///
/// The bare top-level label is never a candidate.
pub fn candidate_domains(hostname: &str) -> Vec<String> {
    let labels: Vec<&str> = hostname
        .trim_end_matches('.')
        .split('.')
        .filter(|label| !label.is_empty())
        .collect();

    if labels.len() < 2 {
        return Vec::new();
    }

    (0..labels.len() - 1)
        .map(|i| labels[i..].join("."))
        .collect()
}
