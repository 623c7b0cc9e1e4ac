/// Retrying HTTP access to the catalog and ratings services
///
/// Backoff lives entirely in here: callers only see an error once the
/// attempt cap is exhausted or the upstream rejects a request outright.
///
/// - HTTP 429: exponential backoff, `min(2^attempt × base, max)`
/// - transport failure (refused, DNS, timeout): linear backoff, `base × (attempt + 1)`
/// - any other non-2xx: fails immediately, no retry
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};

use crate::error::{AppError, AppResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY: usize = 512;

/// Status and body of an HTTP response that reached the server
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced an HTTP response
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Single-shot HTTP GET
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .http_client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay after the `attempt`-th (0-based) 429 response
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay after the `attempt`-th (0-based) transport failure
    pub fn network_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }
}

#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    key_param: &'static str,
    api_key: String,
    policy: RetryPolicy,
}

impl ResilientClient {
    /// `key_param` is the query parameter carrying `api_key` on every request
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        key_param: &'static str,
        api_key: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_param,
            api_key: api_key.into(),
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches and deserializes a JSON document
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let value = self.fetch(path, params).await?;
        serde_json::from_value(value).map_err(|e| {
            tracing::error!(path = %path, error = %e, "Failed to decode upstream response");
            AppError::InvalidResponse(format!("{}: {}", path, e))
        })
    }

    /// Fetches a JSON document, retrying rate limits and transport failures
    pub async fn fetch(&self, path: &str, params: &[(&str, String)]) -> AppResult<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut query: Vec<(String, String)> = Vec::with_capacity(params.len() + 1);
        query.push((self.key_param.to_string(), self.api_key.clone()));
        query.extend(params.iter().map(|(k, v)| (k.to_string(), v.clone())));

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            let is_last = attempt + 1 >= max_attempts;

            match self.transport.get(&url, &query).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    tracing::debug!(path = %path, attempt = attempt + 1, "Upstream request succeeded");
                    return serde_json::from_str(&response.body).map_err(|e| {
                        AppError::InvalidResponse(format!("{}: {}", path, e))
                    });
                }
                Ok(response) if response.status == 429 => {
                    if is_last {
                        tracing::error!(path = %path, attempts = attempt + 1, "Rate limit retries exhausted");
                        return Err(AppError::RateLimitExceeded {
                            attempts: attempt + 1,
                        });
                    }
                    let delay = self.policy.rate_limit_delay(attempt);
                    tracing::warn!(
                        path = %path,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => {
                    let message = truncate(&response.body);
                    tracing::error!(
                        path = %path,
                        status = response.status,
                        body = %message,
                        "Upstream request failed"
                    );
                    return Err(if (400..500).contains(&response.status) {
                        AppError::BadRequest {
                            status: response.status,
                            message,
                        }
                    } else {
                        AppError::Upstream {
                            status: response.status,
                            message,
                        }
                    });
                }
                Err(e) => {
                    if is_last {
                        tracing::error!(path = %path, attempts = attempt + 1, error = %e, "Network retries exhausted");
                        return Err(AppError::NetworkUnavailable {
                            attempts: attempt + 1,
                            message: e.to_string(),
                        });
                    }
                    let delay = self.policy.network_delay(attempt);
                    tracing::warn!(
                        path = %path,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use tokio::time::Instant;

    fn status(code: u16) -> Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: code,
            body: String::new(),
        })
    }

    fn ok_json(body: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn client(transport: MockTransport, max_attempts: u32) -> ResilientClient {
        ResilientClient::new(
            Arc::new(transport),
            "http://catalog.test/3/",
            "api_key",
            "secret",
            RetryPolicy::with_max_attempts(max_attempts),
        )
    }

    #[test]
    fn test_rate_limit_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_delay(0), Duration::from_secs(1));
        assert_eq!(policy.rate_limit_delay(1), Duration::from_secs(2));
        assert_eq!(policy.rate_limit_delay(4), Duration::from_secs(16));
        assert_eq!(policy.rate_limit_delay(5), Duration::from_secs(30));
        assert_eq!(policy.rate_limit_delay(40), Duration::from_secs(30));
    }

    #[test]
    fn test_network_delay_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.network_delay(0), Duration::from_secs(1));
        assert_eq!(policy.network_delay(2), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_rate_limits_then_success() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_get()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| status(429));
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| ok_json(r#"{"page": 1}"#));

        let client = client(transport, 4);
        let start = Instant::now();
        let value = client.fetch("/discover/movie", &[]).await.unwrap();

        assert_eq!(value["page"], 1);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhaustion() {
        let mut transport = MockTransport::new();
        transport.expect_get().times(3).returning(|_, _| status(429));

        let client = client(transport, 3);
        let start = Instant::now();
        let err = client.fetch("/discover/movie", &[]).await.unwrap_err();

        assert!(matches!(err, AppError::RateLimitExceeded { attempts: 3 }));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_then_success() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_get()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(TransportError("connection refused".to_string())));
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| ok_json("[]"));

        let client = client(transport, 4);
        let start = Instant::now();
        client.fetch("/movie/1", &[]).await.unwrap();

        // 1s after the first failure, 2s after the second
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_exhaustion() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(2)
            .returning(|_, _| Err(TransportError("dns failure".to_string())));

        let client = client(transport, 2);
        let err = client.fetch("/movie/1", &[]).await.unwrap_err();
        match err {
            AppError::NetworkUnavailable { attempts, message } => {
                assert_eq!(attempts, 2);
                assert_eq!(message, "dns failure");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mut transport = MockTransport::new();
        transport.expect_get().times(1).returning(|_, _| {
            Ok(RawResponse {
                status: 401,
                body: r#"{"status_message": "Invalid API key"}"#.to_string(),
            })
        });

        let client = client(transport, 4);
        let err = client.fetch("/movie/1", &[]).await.unwrap_err();
        match err {
            AppError::BadRequest { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("Invalid API key"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let mut transport = MockTransport::new();
        transport.expect_get().times(1).returning(|_, _| status(503));

        let client = client(transport, 4);
        let err = client.fetch("/movie/1", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_api_key_and_params_sent() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url, params| {
                url == "http://catalog.test/3/search/movie"
                    && params.contains(&("api_key".to_string(), "secret".to_string()))
                    && params.contains(&("query".to_string(), "alien".to_string()))
            })
            .times(1)
            .returning(|_, _| ok_json(r#"{"results": []}"#));

        let client = client(transport, 1);
        client
            .fetch("/search/movie", &[("query", "alien".to_string())])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_, _| ok_json("<html>"));

        let client = client(transport, 1);
        let err = client.fetch("/movie/1", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_reqwest_transport_round_trip() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/3/movie/603")
                    .query_param("api_key", "secret");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"id": 603, "title": "The Matrix"}"#);
            })
            .await;

        let client = ResilientClient::new(
            Arc::new(ReqwestTransport::new().unwrap()),
            format!("{}/3", server.base_url()),
            "api_key",
            "secret",
            RetryPolicy::with_max_attempts(1),
        );

        let value = client.fetch("/movie/603", &[]).await.unwrap();
        assert_eq!(value["title"], "The Matrix");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reqwest_transport_connection_refused() {
        let transport = ReqwestTransport::new().unwrap();
        let result = transport.get("http://127.0.0.1:1/", &[]).await;
        assert!(result.is_err());
    }
}
