//! # cf-ddns
//!
//! A Cloudflare dynamic DNS agent that keeps one A record pointed at the
//! host's current public IPv4 address.
//!
//! ## Features
//!
//! - Zone auto-detection from the hostname (most specific zone wins)
//! - Creates the A record on first run if it does not exist
//! - Polls the public IP on a fixed interval and only writes on change
//! - Remembers the last published IP across restarts
//!
//! ## Usage
//!
//! ```bash
//! # Poll every 5 minutes
//! cf-ddns home.example.com "$CF_API_TOKEN"
//!
//! # Poll every minute
//! cf-ddns home.example.com "$CF_API_TOKEN" 60
//!
//! # Single pass, for cron or systemd timers
//! cf-ddns --once home.example.com "$CF_API_TOKEN"
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod detector;
pub mod error;
pub mod record;
pub mod updater;
pub mod zone;

pub use cache::IpCache;
pub use client::CloudflareClient;
pub use config::Config;
pub use detector::{IpDetector, IpSource};
pub use error::{ApiError, DdnsError, Result};
pub use record::{DnsRecord, RecordReconciler};
pub use updater::{CycleOutcome, LoopState, UpdateLoop};
pub use zone::{Zone, ZoneResolver};
