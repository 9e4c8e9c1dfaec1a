//! HTTP client shared by index adapters
//!
//! - Configurable timeout and User-Agent
//! - Exponential backoff retry (max 3 retries) for connection failures,
//!   timeouts, HTTP 429 and malformed JSON bodies
//! - HTTP 404 maps to `PackageNotFound` and is never retried

use crate::error::RegistryError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("reqcheck/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::network_error("", "HTTP client", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first backoff delay; later delays double
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// One request attempt, mapping the response status to an error
    async fn send_once(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<reqwest::Response, RegistryError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::timeout(package, registry)
            } else {
                RegistryError::network_error(package, registry, e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(RegistryError::rate_limit_exceeded(registry)),
            StatusCode::NOT_FOUND => Err(RegistryError::package_not_found(package, registry)),
            status if status.is_server_error() => Err(RegistryError::network_error(
                package,
                registry,
                format!("HTTP {}", status),
            )),
            status if !status.is_success() => Err(RegistryError::InvalidResponse {
                package: package.to_string(),
                registry: registry.to_string(),
                message: format!("HTTP {}", status),
            }),
            _ => Ok(response),
        }
    }

    /// One attempt including body decoding
    async fn fetch_json_once<T: DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<T, RegistryError> {
        let response = self.send_once(url, package, registry).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RegistryError::InvalidResponse {
                package: package.to_string(),
                registry: registry.to_string(),
                message: format!("failed to parse JSON: {}", e),
            })
    }

    /// GET a JSON document, retrying transient failures with backoff
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<T, RegistryError> {
        let mut delay = self.base_delay;
        let mut attempt = 0;

        loop {
            debug!(url, attempt, "GET");
            match self.fetch_json_once(url, package, registry).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    warn!(
                        package,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        name: String,
    }

    fn fast_client() -> HttpClient {
        HttpClient::new()
            .unwrap()
            .with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_http_client_creation() {
        assert!(HttpClient::new().is_ok());
        assert!(HttpClient::with_config(Duration::from_secs(60), "test-agent/1.0").is_ok());
    }

    #[test]
    fn test_http_client_builders() {
        let client = HttpClient::new()
            .unwrap()
            .with_max_retries(5)
            .with_base_delay(Duration::from_millis(10));
        assert_eq!(client.max_retries, 5);
        assert_eq!(client.base_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(30));
        assert!(DEFAULT_USER_AGENT.starts_with("reqcheck/"));
        assert_eq!(MAX_RETRIES, 3);
        assert_eq!(BASE_DELAY_MS, 100);
    }

    #[tokio::test]
    async fn test_get_json_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/pkg/json");
                then.status(200).json_body(serde_json::json!({ "name": "pkg" }));
            })
            .await;

        let payload: Payload = fast_client()
            .get_json(&server.url("/pkg/json"), "pkg", "test")
            .await
            .unwrap();
        assert_eq!(payload.name, "pkg");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/missing/json");
                then.status(404);
            })
            .await;

        let result: Result<Payload, _> = fast_client()
            .get_json(&server.url("/missing/json"), "missing", "test")
            .await;
        assert!(matches!(result, Err(RegistryError::PackageNotFound { .. })));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_rate_limit_retried_until_exhausted() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/busy/json");
                then.status(429);
            })
            .await;

        let result: Result<Payload, _> = fast_client()
            .get_json(&server.url("/busy/json"), "busy", "test")
            .await;
        assert!(matches!(result, Err(RegistryError::RateLimitExceeded { .. })));
        mock.assert_hits_async(4).await;
    }

    #[tokio::test]
    async fn test_malformed_json_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/bad/json");
                then.status(200).body("not json");
            })
            .await;

        let result: Result<Payload, _> = fast_client()
            .with_max_retries(1)
            .get_json(&server.url("/bad/json"), "bad", "test")
            .await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse { .. })));
        mock.assert_hits_async(2).await;
    }
}
