//! On-disk record of the last IP successfully published for a hostname.
//!
//! The file holds the bare dotted-quad and nothing else. It is written only
//! after Cloudflare has confirmed an update, so a restart never repeats a
//! write for an address that is already live.

use crate::error::Result;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Per-hostname last-published-IP file.
#[derive(Debug, Clone)]
pub struct IpCache {
    path: PathBuf,
}

impl IpCache {
    /// Cache file for `hostname` inside `dir`.
    pub fn for_hostname(dir: impl AsRef<Path>, hostname: &str) -> Self {
        Self {
            path: dir.as_ref().join(cache_file_name(hostname)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached address.
    ///
    /// A missing, unreadable or malformed file means "no prior IP".
    pub async fn load(&self) -> Option<Ipv4Addr> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No IP cache at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Could not read IP cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        match content.trim().parse() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::warn!(
                    "Ignoring corrupted IP cache {} ({:?})",
                    self.path.display(),
                    content.trim()
                );
                None
            }
        }
    }

    /// Replace the cached address.
    pub async fn store(&self, ip: Ipv4Addr) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Write-then-rename so a crash never leaves a truncated address.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, ip.to_string()).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Deterministic file name for a hostname's cache.
pub fn cache_file_name(hostname: &str) -> String {
    let sanitized: String = hostname
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("cf-ddns-{}.ip", sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio_test::assert_ok;

    #[test]
    fn test_cache_file_name_substitutes_non_alphanumerics() {
        assert_eq!(cache_file_name("home.example.com"), "cf-ddns-home_example_com.ip");
        assert_eq!(cache_file_name("my-host.example.com"), "cf-ddns-my_host_example_com.ip");
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let cache = IpCache::for_hostname(dir.path(), "home.example.com");
        assert_eq!(cache.load().await, None);
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = tempdir().unwrap();
        let cache = IpCache::for_hostname(dir.path(), "home.example.com");

        assert_ok!(cache.store(Ipv4Addr::new(1, 2, 3, 4)).await);
        assert_eq!(cache.load().await, Some(Ipv4Addr::new(1, 2, 3, 4)));

        let raw = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(raw, "1.2.3.4");
        assert!(!cache.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let dir = tempdir().unwrap();
        let cache = IpCache::for_hostname(dir.path(), "home.example.com");

        assert_ok!(cache.store(Ipv4Addr::new(1, 2, 3, 4)).await);
        assert_ok!(cache.store(Ipv4Addr::new(5, 6, 7, 8)).await);

        assert_eq!(std::fs::read_to_string(cache.path()).unwrap(), "5.6.7.8");
    }

    #[tokio::test]
    async fn test_corrupted_file_is_none() {
        let dir = tempdir().unwrap();
        let cache = IpCache::for_hostname(dir.path(), "home.example.com");
        std::fs::write(cache.path(), "not an ip\n{garbage}").unwrap();

        assert_eq!(cache.load().await, None);
    }

    #[tokio::test]
    async fn test_store_creates_directory() {
        let dir = tempdir().unwrap();
        let cache = IpCache::for_hostname(dir.path().join("nested/state"), "home.example.com");

        assert_ok!(cache.store(Ipv4Addr::new(9, 9, 9, 9)).await);
        assert_eq!(cache.load().await, Some(Ipv4Addr::new(9, 9, 9, 9)));
    }
}
