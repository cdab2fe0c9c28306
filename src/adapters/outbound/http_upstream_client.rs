//! HTTP Upstream Client
//!
//! Implements UpstreamClient against a binlist-style lookup API using reqwest.

use crate::domain::ports::{TransportError, UpstreamClient, UpstreamResponse};
use crate::domain::value_objects::LookupKey;
use async_trait::async_trait;
use std::time::Duration;

/// API version the lookup provider expects in `Accept-Version`.
pub const ACCEPT_VERSION: &str = "3";

/// Configuration for the upstream HTTP client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the lookup API (e.g., "https://lookup.binlist.net")
    pub base_url: String,
    /// Timeout for a single request
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://lookup.binlist.net".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// reqwest-backed upstream client.
pub struct HttpUpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstreamClient {
    /// Create a client with the given configuration.
    pub fn new(config: UpstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, key: &LookupKey) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn fetch(&self, key: &LookupKey) -> Result<UpstreamResponse, TransportError> {
        let url = self.url_for(key);
        tracing::debug!("fetching issuer info from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept-Version", ACCEPT_VERSION)
            .send()
            .await
            .map_err(|e| TransportError(format!("request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("reading body from {} failed: {}", url, e)))?;

        Ok(UpstreamResponse::new(status, body))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpUpstreamClient {
        HttpUpstreamClient::new(UpstreamConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[test]
    fn test_upstream_config_default() {
        let config = UpstreamConfig::default();
        assert_eq!(config.base_url, "https://lookup.binlist.net");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let client = HttpUpstreamClient::new(UpstreamConfig {
            base_url: "http://localhost:9999/".to_string(),
            ..Default::default()
        })
        .unwrap();

        let key = LookupKey::extract("45717360").unwrap();
        assert_eq!(client.url_for(&key), "http://localhost:9999/45717360");
    }

    #[tokio::test]
    async fn test_fetch_sends_accept_version_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/45717360"))
            .and(header("Accept-Version", "3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"country": {"alpha2": "DK"}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let key = LookupKey::extract("4571736000000000").unwrap();
        let response = client_for(&mock_server).fetch(&key).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.body.contains("DK"));
    }

    #[tokio::test]
    async fn test_fetch_passes_error_status_through() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/37828224"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        let key = LookupKey::extract("37828224").unwrap();
        let response = client_for(&mock_server).fetch(&key).await.unwrap();

        assert_eq!(response, UpstreamResponse::new(404, "Not Found"));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let client = HttpUpstreamClient::new(UpstreamConfig {
            base_url: mock_server.uri(),
            timeout: Duration::from_millis(100),
        })
        .unwrap();

        let key = LookupKey::extract("37828224").unwrap();
        assert!(client.fetch(&key).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        let client = HttpUpstreamClient::new(UpstreamConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        let key = LookupKey::extract("37828224").unwrap();
        let err = client.fetch(&key).await.unwrap_err();
        assert!(err.0.contains("127.0.0.1:1"));
    }
}
