//! A-record lookup, creation and overwrite.

use crate::client::{ApiResult, CloudflareClient};
use crate::detector::IpSource;
use crate::error::{DdnsError, Result};
use crate::zone::Zone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// TTL value Cloudflare interprets as "automatic".
pub const AUTO_TTL: u32 = 1;

/// A DNS record as returned by Cloudflare.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub modified_on: Option<DateTime<Utc>>,
}

fn default_ttl() -> u32 {
    AUTO_TTL
}

/// Body of both the create and the overwrite request.
#[derive(Debug, Serialize)]
struct RecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: String,
    ttl: u32,
    proxied: bool,
}

impl<'a> RecordRequest<'a> {
    fn a_record(hostname: &'a str, ip: Ipv4Addr) -> Self {
        Self {
            record_type: "A",
            name: hostname,
            content: ip.to_string(),
            ttl: AUTO_TTL,
            proxied: false,
        }
    }
}

/// Keeps exactly one A record per hostname.
pub struct RecordReconciler {
    client: CloudflareClient,
    ip_source: Arc<dyn IpSource>,
}

impl RecordReconciler {
    pub fn new(client: CloudflareClient, ip_source: Arc<dyn IpSource>) -> Self {
        Self { client, ip_source }
    }

    /// Return the A record for `hostname`, creating it against the current
    /// public IP if the zone has none.
    ///
    /// An existing record is returned untouched. Only an explicit successful
    /// lookup with zero matches leads to creation; a failed lookup is a setup
    /// error.
    pub async fn ensure_record(&self, zone: &Zone, hostname: &str) -> Result<DnsRecord> {
        let records: Vec<DnsRecord> = self
            .client
            .get(
                &format!("/zones/{}/dns_records", zone.id),
                &[("type", "A"), ("name", hostname)],
            )
            .await
            .map_err(|e| setup_error(hostname, format!("record lookup failed: {}", e)))?;

        if records.len() > 1 {
            tracing::warn!(
                "{} A records exist for {}; using the first one ({})",
                records.len(),
                hostname,
                records[0].id
            );
        }

        if let Some(record) = records.into_iter().next() {
            match record.modified_on {
                Some(modified) => tracing::info!(
                    "Found A record {} for {} -> {} (last modified {})",
                    record.id,
                    hostname,
                    record.content,
                    modified.format("%Y-%m-%d %H:%M:%S")
                ),
                None => tracing::info!(
                    "Found A record {} for {} -> {}",
                    record.id,
                    hostname,
                    record.content
                ),
            }
            return Ok(record);
        }

        tracing::info!("No A record for {}; creating one", hostname);

        let ip = self
            .ip_source
            .get_public_ipv4()
            .await
            .map_err(|e| setup_error(hostname, format!("cannot create record: {}", e)))?;

        let created: DnsRecord = self
            .client
            .post(
                &format!("/zones/{}/dns_records", zone.id),
                &RecordRequest::a_record(hostname, ip),
            )
            .await
            .map_err(|e| setup_error(hostname, format!("record creation failed: {}", e)))?;

        tracing::info!("Created A record {} for {} -> {}", created.id, hostname, ip);
        Ok(created)
    }

    /// Overwrite the record with a full A-record body pointing at `new_ip`.
    pub async fn update_record(
        &self,
        zone: &Zone,
        record_id: &str,
        hostname: &str,
        new_ip: Ipv4Addr,
    ) -> ApiResult<DnsRecord> {
        self.client
            .put(
                &format!("/zones/{}/dns_records/{}", zone.id, record_id),
                &RecordRequest::a_record(hostname, new_ip),
            )
            .await
    }
}

fn setup_error(hostname: &str, reason: String) -> DdnsError {
    DdnsError::RecordSetup {
        hostname: hostname.to_string(),
        reason,
    }
}
