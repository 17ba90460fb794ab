// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP transport for the Kusto REST endpoints.
//!
//! This module provides a low-level HTTP client with:
//! - Connection pooling
//! - Automatic retry with exponential backoff
//! - Bearer token authentication
//! - Configurable timeouts

use crate::auth::AuthProvider;
use crate::error::{Error, Result};
use reqwest::{Client, Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Whether a request may be sent again once the service could have acted
/// on it.
///
/// Non-idempotent requests (streaming ingest, management commands, queue
/// puts) are only retried when the failure proves the service never
/// processed them: a failed connect, 429 or 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Idempotency {
    #[default]
    Idempotent,
    NonIdempotent,
}

/// Transport-level failure classes relevant to retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransportFailure {
    /// The connection was never established.
    Connect,
    Timeout,
    /// Failed while sending; the service may have seen the request.
    Request,
    Other,
}

impl TransportFailure {
    fn of(error: &reqwest::Error) -> Self {
        if error.is_connect() {
            TransportFailure::Connect
        } else if error.is_timeout() {
            TransportFailure::Timeout
        } else if error.is_request() {
            TransportFailure::Request
        } else {
            TransportFailure::Other
        }
    }
}

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Read timeout duration. Bounds the whole request, including the
    /// time the service spends executing the query.
    pub read_timeout: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retry attempts (doubles each retry).
    pub retry_delay: Duration,
    /// Maximum number of idle connections per host.
    pub max_connections_per_host: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            // Service-side default query timeout is 4 minutes; leave headroom.
            read_timeout: Duration::from_secs(4 * 60 + 30),
            max_retries: 3,
            retry_delay: Duration::from_millis(1500),
            max_connections_per_host: 100,
            user_agent: format!("Kusto.Rust.Client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client used by every Kusto endpoint.
///
/// This client handles:
/// - Connection pooling (via reqwest)
/// - Automatic retry with exponential backoff for transient failures
/// - Bearer token authentication
/// - User-Agent header injection
#[derive(Debug)]
pub struct KustoHttpClient {
    client: Client,
    config: HttpClientConfig,
    auth_provider: Arc<dyn AuthProvider>,
}

impl KustoHttpClient {
    /// Creates a new HTTP client with the given configuration and auth provider.
    pub fn new(config: HttpClientConfig, auth_provider: Arc<dyn AuthProvider>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            config,
            auth_provider,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Returns the underlying reqwest client for building requests.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the authorization header value.
    pub fn auth_header(&self) -> Result<String> {
        self.auth_provider.get_auth_header()
    }

    /// Execute an HTTP request with automatic retry logic and authentication.
    ///
    /// Retries are performed for:
    /// - Connect, timeout and request-building network errors
    /// - 429 Too Many Requests
    /// - 502 Bad Gateway
    /// - 503 Service Unavailable
    /// - 504 Gateway Timeout
    ///
    /// Any other non-success status is returned immediately as
    /// [`Error::Http`] carrying the response body.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.execute_impl(request, true, Idempotency::Idempotent)
            .await
    }

    /// Like [`execute`](Self::execute), but never resends a request the
    /// service may already have processed.
    pub async fn execute_non_idempotent(&self, request: Request) -> Result<Response> {
        self.execute_impl(request, true, Idempotency::NonIdempotent)
            .await
    }

    /// Execute a request without the bearer token (SAS-signed storage URLs).
    pub async fn execute_without_auth(
        &self,
        request: Request,
        idempotency: Idempotency,
    ) -> Result<Response> {
        self.execute_impl(request, false, idempotency).await
    }

    async fn execute_impl(
        &self,
        request: Request,
        with_auth: bool,
        idempotency: Idempotency,
    ) -> Result<Response> {
        let mut attempts = 0;

        // Clone the request parts we need for retries
        let method = request.method().clone();
        let url = request.url().clone();
        let headers = request.headers().clone();
        let timeout = request.timeout().copied();
        let body_bytes = request
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| b.to_vec());

        loop {
            attempts += 1;

            let mut req_builder = self
                .client
                .request(method.clone(), url.clone())
                .headers(headers.clone());

            if with_auth {
                req_builder = req_builder.header("Authorization", self.auth_header()?);
            }

            if let Some(ref body) = body_bytes {
                req_builder = req_builder.body(body.clone());
            }

            if let Some(timeout) = timeout {
                req_builder = req_builder.timeout(timeout);
            }

            let request = req_builder.build()?;

            debug!(
                "Executing {} {} (attempt {}/{})",
                method,
                url,
                attempts,
                self.config.max_retries + 1
            );

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if Self::should_retry_status(status, idempotency)
                        && attempts <= self.config.max_retries
                    {
                        warn!(
                            "Request failed with {} (attempt {}/{}), retrying...",
                            status,
                            attempts,
                            self.config.max_retries + 1
                        );
                        self.wait_for_retry(attempts).await;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::Http {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) => {
                    if Self::should_retry_failure(TransportFailure::of(&e), idempotency)
                        && attempts <= self.config.max_retries
                    {
                        warn!(
                            "Request failed with error (attempt {}/{}): {}, retrying...",
                            attempts,
                            self.config.max_retries + 1,
                            e
                        );
                        self.wait_for_retry(attempts).await;
                        continue;
                    }

                    warn!("HTTP request failed after {} attempts: {}", attempts, e);
                    return Err(Error::Request(e));
                }
            }
        }
    }

    /// Check if the HTTP status code indicates a retryable error.
    pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
                | StatusCode::BAD_GATEWAY
        )
    }

    pub(crate) fn should_retry_status(status: StatusCode, idempotency: Idempotency) -> bool {
        match idempotency {
            Idempotency::Idempotent => Self::is_retryable_status(status),
            Idempotency::NonIdempotent => matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
            ),
        }
    }

    pub(crate) fn should_retry_failure(
        failure: TransportFailure,
        idempotency: Idempotency,
    ) -> bool {
        match failure {
            TransportFailure::Connect => true,
            TransportFailure::Timeout | TransportFailure::Request => {
                idempotency == Idempotency::Idempotent
            }
            TransportFailure::Other => false,
        }
    }

    /// Delay before the given retry attempt: `retry_delay * 2^(attempt - 1)`.
    pub(crate) fn retry_delay_for(&self, attempt: u32) -> Duration {
        self.config.retry_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    async fn wait_for_retry(&self, attempt: u32) {
        let delay = self.retry_delay_for(attempt);
        debug!("Waiting {:?} before retry", delay);
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessToken;

    #[test]
    fn test_http_client_config_default() {
        let config = HttpClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(270));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_connections_per_host, 100);
        assert!(config.user_agent.starts_with("Kusto.Rust.Client/"));
    }

    #[test]
    fn test_is_retryable_status() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
            StatusCode::BAD_GATEWAY,
        ] {
            assert!(KustoHttpClient::is_retryable_status(status), "{}", status);
        }
        for status in [
            StatusCode::OK,
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert!(!KustoHttpClient::is_retryable_status(status), "{}", status);
        }
    }

    #[test]
    fn test_non_idempotent_requests_are_not_resent_after_timeout() {
        use TransportFailure::*;

        for failure in [Connect, Timeout, Request] {
            assert!(KustoHttpClient::should_retry_failure(
                failure,
                Idempotency::Idempotent
            ));
        }
        assert!(KustoHttpClient::should_retry_failure(
            Connect,
            Idempotency::NonIdempotent
        ));
        assert!(!KustoHttpClient::should_retry_failure(
            Timeout,
            Idempotency::NonIdempotent
        ));
        assert!(!KustoHttpClient::should_retry_failure(
            Request,
            Idempotency::NonIdempotent
        ));
        assert!(!KustoHttpClient::should_retry_failure(
            Other,
            Idempotency::Idempotent
        ));
    }

    #[test]
    fn test_non_idempotent_status_retries() {
        let once = Idempotency::NonIdempotent;
        assert!(KustoHttpClient::should_retry_status(StatusCode::TOO_MANY_REQUESTS, once));
        assert!(KustoHttpClient::should_retry_status(StatusCode::SERVICE_UNAVAILABLE, once));
        assert!(!KustoHttpClient::should_retry_status(StatusCode::GATEWAY_TIMEOUT, once));
        assert!(!KustoHttpClient::should_retry_status(StatusCode::BAD_GATEWAY, once));
        assert!(KustoHttpClient::should_retry_status(
            StatusCode::GATEWAY_TIMEOUT,
            Idempotency::Idempotent
        ));
    }

    #[tokio::test]
    async fn test_auth_header() {
        let auth = Arc::new(AccessToken::new("test-token"));
        let client = KustoHttpClient::new(HttpClientConfig::default(), auth).unwrap();
        assert_eq!(client.auth_header().unwrap(), "Bearer test-token");
    }

    #[tokio::test]
    async fn test_retry_delay_doubles() {
        let auth = Arc::new(AccessToken::new("t"));
        let config = HttpClientConfig {
            retry_delay: Duration::from_millis(100),
            ..Default::default()
        };
        let client = KustoHttpClient::new(config, auth).unwrap();
        assert_eq!(client.retry_delay_for(1), Duration::from_millis(100));
        assert_eq!(client.retry_delay_for(2), Duration::from_millis(200));
        assert_eq!(client.retry_delay_for(3), Duration::from_millis(400));
    }
}
