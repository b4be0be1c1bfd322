//! The long-running reconciliation loop.
//!
//! Startup resolves the zone and the A record once; both are fatal if they
//! fail. After that every tick compares the public IP with the last address
//! Cloudflare confirmed, and pushes a full overwrite when they differ. A
//! failed write leaves the last known IP untouched so the next tick retries
//! the same transition.

use crate::cache::IpCache;
use crate::client::CloudflareClient;
use crate::detector::IpSource;
use crate::error::{ApiError, Result};
use crate::record::RecordReconciler;
use crate::zone::{Zone, ZoneResolver};
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Default polling interval (5 minutes).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Lifecycle of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    Stopped,
}

/// What a single iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No public IP could be determined.
    Skipped,
    /// Public IP matches the last published address.
    Unchanged(Ipv4Addr),
    /// Cloudflare accepted the new address.
    Updated {
        previous: Option<Ipv4Addr>,
        current: Ipv4Addr,
    },
    /// Cloudflare rejected the write; it will be retried next tick.
    Failed { attempted: Ipv4Addr, error: ApiError },
}

impl CycleOutcome {
    /// Whether the published record is known to match the public IP.
    pub fn is_in_sync(&self) -> bool {
        matches!(self, CycleOutcome::Unchanged(_) | CycleOutcome::Updated { .. })
    }
}

/// Polls the public IP and keeps one A record pointed at it.
pub struct UpdateLoop {
    reconciler: RecordReconciler,
    ip_source: Arc<dyn IpSource>,
    cache: IpCache,
    hostname: String,
    zone: Zone,
    record_id: String,
    last_known_ip: Option<Ipv4Addr>,
    interval: Duration,
    state: LoopState,
}

impl UpdateLoop {
    /// Resolve the zone, ensure the record exists and load the cached IP.
    ///
    /// Any error returned here is fatal: the loop has nothing to update.
    pub async fn start(
        client: CloudflareClient,
        ip_source: Arc<dyn IpSource>,
        hostname: &str,
        cache: IpCache,
        interval: Duration,
    ) -> Result<Self> {
        tracing::info!("Starting DNS updater for {}", hostname);

        let zone = ZoneResolver::new(client.clone()).resolve_zone(hostname).await?;

        let reconciler = RecordReconciler::new(client, Arc::clone(&ip_source));
        let record = reconciler.ensure_record(&zone, hostname).await?;

        let last_known_ip = cache.load().await;
        match last_known_ip {
            Some(ip) => tracing::info!("Last published IP: {}", ip),
            None => tracing::info!("No last published IP; first detected IP will be pushed"),
        }

        let mut updater = Self::new(
            reconciler, ip_source, cache, hostname, zone, record.id, interval,
        );
        updater.last_known_ip = last_known_ip;
        Ok(updater)
    }

    /// Assemble a loop from already-resolved parts.
    ///
    /// The last known IP starts empty; [`UpdateLoop::start`] seeds it from
    /// the cache.
    pub fn new(
        reconciler: RecordReconciler,
        ip_source: Arc<dyn IpSource>,
        cache: IpCache,
        hostname: impl Into<String>,
        zone: Zone,
        record_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            reconciler,
            ip_source,
            cache,
            hostname: hostname.into(),
            zone,
            record_id: record_id.into(),
            last_known_ip: None,
            interval,
            state: LoopState::Starting,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn last_known_ip(&self) -> Option<Ipv4Addr> {
        self.last_known_ip
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Run one poll-compare-update iteration.
    pub async fn run_once(&mut self) -> CycleOutcome {
        let current = match self.ip_source.get_public_ipv4().await {
            Ok(ip) => ip,
            Err(e) => {
                tracing::warn!("Skipping cycle, public IP unknown: {}", e);
                return CycleOutcome::Skipped;
            }
        };

        if self.last_known_ip == Some(current) {
            tracing::info!("IP unchanged ({})", current);
            return CycleOutcome::Unchanged(current);
        }

        match self.last_known_ip {
            Some(previous) => tracing::info!("IP changed: {} -> {}", previous, current),
            None => tracing::info!("Publishing IP {} (no previous value)", current),
        }

        match self
            .reconciler
            .update_record(&self.zone, &self.record_id, &self.hostname, current)
            .await
        {
            Ok(_) => {
                let previous = self.last_known_ip.replace(current);
                if let Err(e) = self.cache.store(current).await {
                    tracing::warn!(
                        "Updated {} but could not write {}: {}",
                        self.hostname,
                        self.cache.path().display(),
                        e
                    );
                }
                tracing::info!("Updated {} -> {}", self.hostname, current);
                CycleOutcome::Updated { previous, current }
            }
            Err(error) => {
                tracing::error!("Update of {} to {} failed: {}", self.hostname, current, error);
                CycleOutcome::Failed {
                    attempted: current,
                    error,
                }
            }
        }
    }

    /// Run iterations on the configured interval until `shutdown` resolves.
    ///
    /// Iterations never overlap; an iteration in flight when `shutdown`
    /// fires is dropped.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.state = LoopState::Running;
        tracing::info!(
            "Polling every {}s for {}",
            self.interval.as_secs(),
            self.hostname
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = async {
                    ticker.tick().await;
                    self.run_once().await;
                } => {}
            }
        }

        self.state = LoopState::Stopped;
        tracing::info!("DNS updater for {} stopped", self.hostname);
    }
}
