//! cf-ddns - Cloudflare dynamic DNS agent.

use anyhow::Context;
use cf_ddns::config::{default_config_paths, CliOverrides, Config, FileConfig};
use cf_ddns::{CloudflareClient, DdnsError, IpCache, IpDetector, IpSource, UpdateLoop};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

const IP_DETECTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "cf-ddns")]
#[command(about = "Keep a Cloudflare A record pointed at this host's public IPv4 address")]
#[command(version)]
struct Cli {
    /// Fully-qualified hostname to update (e.g. home.example.com)
    hostname: Option<String>,

    /// Cloudflare API token ($NAME reads it from the environment)
    api_token: Option<String>,

    /// Check interval in seconds [default: 300]
    interval_seconds: Option<u64>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the last-published-IP file
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn get_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path);
    }

    default_config_paths().into_iter().find(|p| p.exists())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let file = match get_config_path(cli.config) {
        Some(path) => FileConfig::load_from(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => FileConfig::default(),
    };

    let overrides = CliOverrides {
        hostname: cli.hostname,
        api_token: cli.api_token,
        interval_secs: cli.interval_seconds,
        cache_dir: cli.cache_dir,
    };

    let config = match Config::resolve(file, overrides) {
        Ok(config) => config,
        Err(e @ DdnsError::Config(_)) => {
            eprintln!("{}\n\n{}", e, Cli::command().render_usage());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let client =
        CloudflareClient::with_options(&config.api_token, &config.api_base_url, config.http_timeout);
    let ip_source: Arc<dyn IpSource> = Arc::new(IpDetector::with_options(
        config.ip_services.clone(),
        IP_DETECTION_TIMEOUT,
    ));
    let cache = IpCache::for_hostname(&config.cache_dir, &config.hostname);

    let mut updater = UpdateLoop::start(
        client,
        ip_source,
        &config.hostname,
        cache,
        config.interval,
    )
    .await
    .context("Startup failed")?;

    if cli.once {
        let outcome = updater.run_once().await;
        if !outcome.is_in_sync() {
            std::process::exit(1);
        }
        return Ok(());
    }

    updater.run_until(wait_for_shutdown()).await;
    Ok(())
}

async fn wait_for_shutdown() {
    match shutdown_signal().await {
        Ok(name) => tracing::info!("Received {}, shutting down", name),
        Err(e) => {
            tracing::error!("{}; running until killed", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Wait for SIGTERM or SIGINT.
#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl-C.
#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
