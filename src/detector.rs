//! Public IPv4 detection.

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Default IP-echo services, tried in order.
pub const DEFAULT_IP_SERVICES: &[&str] = &["https://api.ipify.org", "https://ipv4.icanhazip.com"];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the host's current public IPv4 address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public IPv4 address.
    async fn get_public_ipv4(&self) -> Result<Ipv4Addr>;
}

/// IP detector with fallback services.
pub struct IpDetector {
    client: reqwest::Client,
    services: Vec<String>,
}

impl IpDetector {
    /// Create a new IP detector with default services.
    pub fn new() -> Self {
        Self::with_services(DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect())
    }

    /// Create a new IP detector with custom services.
    pub fn with_services(services: Vec<String>) -> Self {
        Self::with_options(services, DEFAULT_TIMEOUT)
    }

    /// Create a new IP detector with custom services and request timeout.
    pub fn with_options(services: Vec<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, services }
    }

    /// Try a single IP detection service.
    async fn try_service(&self, url: &str) -> Result<Ipv4Addr> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::IpDetection(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let text = response.text().await?;
        let ip_str = text.trim();

        ip_str
            .parse()
            .map_err(|_| DdnsError::IpDetection(format!("Invalid IPv4 response: {:?}", ip_str)))
    }
}

impl Default for IpDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IpSource for IpDetector {
    async fn get_public_ipv4(&self) -> Result<Ipv4Addr> {
        for service in &self.services {
            match self.try_service(service).await {
                Ok(ip) => {
                    tracing::debug!("Detected IPv4 {} from {}", ip, service);
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::warn!("Service {} failed: {}", service, e);
                }
            }
        }

        Err(DdnsError::IpDetection(
            "All IP detection services failed".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_default_services() {
        let detector = IpDetector::new();
        assert_eq!(detector.services.len(), 2);
    }

    #[tokio::test]
    async fn test_primary_service_wins() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/primary"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4\n"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/secondary"))
            .respond_with(ResponseTemplate::new(200).set_body_string("5.6.7.8"))
            .expect(0)
            .mount(&mock_server)
            .await;

        let detector = IpDetector::with_services(vec![
            format!("{}/primary", mock_server.uri()),
            format!("{}/secondary", mock_server.uri()),
        ]);

        let ip = assert_ok!(detector.get_public_ipv4().await);
        assert_eq!(ip, Ipv4Addr::new(1, 2, 3, 4));
    }

    #[tokio::test]
    async fn test_falls_back_on_empty_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/primary"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/secondary"))
            .respond_with(ResponseTemplate::new(200).set_body_string("5.6.7.8"))
            .mount(&mock_server)
            .await;

        let detector = IpDetector::with_services(vec![
            format!("{}/primary", mock_server.uri()),
            format!("{}/secondary", mock_server.uri()),
        ]);

        let ip = assert_ok!(detector.get_public_ipv4().await);
        assert_eq!(ip, Ipv4Addr::new(5, 6, 7, 8));
    }

    #[tokio::test]
    async fn test_rejects_non_ipv4_answers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/primary"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2001:db8::1"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/secondary"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
            .mount(&mock_server)
            .await;

        let detector = IpDetector::with_services(vec![
            format!("{}/primary", mock_server.uri()),
            format!("{}/secondary", mock_server.uri()),
        ]);

        let err = assert_err!(detector.get_public_ipv4().await);
        assert!(matches!(err, DdnsError::IpDetection(_)));
    }

    #[tokio::test]
    async fn test_slow_service_times_out_and_falls_back() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("1.2.3.4")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("5.6.7.8"))
            .mount(&mock_server)
            .await;

        let detector = IpDetector::with_options(
            vec![
                format!("{}/slow", mock_server.uri()),
                format!("{}/fast", mock_server.uri()),
            ],
            Duration::from_millis(200),
        );

        let ip = assert_ok!(detector.get_public_ipv4().await);
        assert_eq!(ip, Ipv4Addr::new(5, 6, 7, 8));
    }
}
