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

//! Client configuration.
//!
//! [`ClientBuilder`] collects the cluster URL, credentials and transport
//! settings, either through typed `with_*` methods or string-keyed options
//! (`kusto.*`), and builds an async or blocking client.

use crate::auth::{AccessToken, AuthProvider};
use crate::blocking::BlockingKustoClient;
use crate::client::{HttpClientConfig, KustoBackend, KustoHttpClient, RestBackend};
use crate::error::{Error, Result};
use crate::ingest::QueuedIngestClient;
use crate::kusto::KustoClient;
use crate::logging::{init_logging, LogConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const CLUSTER_URL_OPTION: &str = "kusto.cluster_url";
pub const ACCESS_TOKEN_OPTION: &str = "kusto.access_token";
pub const APPLICATION_OPTION: &str = "kusto.application";
pub const USER_OPTION: &str = "kusto.user";
pub const CONNECT_TIMEOUT_OPTION: &str = "kusto.http.connect_timeout_ms";
pub const READ_TIMEOUT_OPTION: &str = "kusto.http.read_timeout_ms";
pub const MAX_RETRIES_OPTION: &str = "kusto.http.max_retries";
pub const RETRY_DELAY_OPTION: &str = "kusto.http.retry_delay_ms";
pub const LOG_LEVEL_OPTION: &str = "kusto.log_level";
pub const LOG_FILE_OPTION: &str = "kusto.log_file";

/// Builder for [`KustoClient`] and [`BlockingKustoClient`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    cluster_url: Option<String>,
    auth_provider: Option<Arc<dyn AuthProvider>>,
    application: Option<String>,
    user: Option<String>,
    http_config: HttpClientConfig,
    log_config: LogConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cluster_url(&self) -> Option<&str> {
        self.cluster_url.as_deref()
    }

    pub fn http_config(&self) -> &HttpClientConfig {
        &self.http_config
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log_config
    }

    pub fn with_cluster_url(mut self, url: impl Into<String>) -> Self {
        self.cluster_url = Some(url.into());
        self
    }

    /// Authenticate with a fixed bearer token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.auth_provider = Some(Arc::new(AccessToken::new(token)));
        self
    }

    /// Authenticate through a custom provider, e.g. one that refreshes
    /// tokens from an identity service.
    pub fn with_auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth_provider = Some(provider);
        self
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = config;
        self
    }

    pub fn with_log_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    fn parse_millis_option(key: &str, value: &str) -> Result<Duration> {
        value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| invalid_option(key, value))
    }

    /// Set an option by its `kusto.*` key.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            CLUSTER_URL_OPTION => self.cluster_url = Some(value.to_string()),
            ACCESS_TOKEN_OPTION => {
                self.auth_provider = Some(Arc::new(AccessToken::new(value)));
            }
            APPLICATION_OPTION => self.application = Some(value.to_string()),
            USER_OPTION => self.user = Some(value.to_string()),
            CONNECT_TIMEOUT_OPTION => {
                self.http_config.connect_timeout = Self::parse_millis_option(key, value)?;
            }
            READ_TIMEOUT_OPTION => {
                self.http_config.read_timeout = Self::parse_millis_option(key, value)?;
            }
            RETRY_DELAY_OPTION => {
                self.http_config.retry_delay = Self::parse_millis_option(key, value)?;
            }
            MAX_RETRIES_OPTION => {
                self.http_config.max_retries = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid_option(key, value))?;
            }
            LOG_LEVEL_OPTION => {
                const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
                if !LEVELS.contains(&value.to_lowercase().as_str()) {
                    return Err(invalid_option(key, value));
                }
                self.log_config.level = Some(value.to_string());
            }
            LOG_FILE_OPTION => self.log_config.file = Some(value.to_string()),
            _ => {
                return Err(Error::invalid_argument(format!("Unknown option: {}", key)));
            }
        }
        Ok(())
    }

    /// Read back a string option.
    pub fn get_option(&self, key: &str) -> Result<String> {
        let value = match key {
            CLUSTER_URL_OPTION => self.cluster_url.clone(),
            APPLICATION_OPTION => self.application.clone(),
            USER_OPTION => self.user.clone(),
            CONNECT_TIMEOUT_OPTION => Some(self.http_config.connect_timeout.as_millis().to_string()),
            READ_TIMEOUT_OPTION => Some(self.http_config.read_timeout.as_millis().to_string()),
            RETRY_DELAY_OPTION => Some(self.http_config.retry_delay.as_millis().to_string()),
            MAX_RETRIES_OPTION => Some(self.http_config.max_retries.to_string()),
            LOG_LEVEL_OPTION => self.log_config.level.clone(),
            LOG_FILE_OPTION => self.log_config.file.clone(),
            _ => return Err(Error::invalid_argument(format!("Unknown option: {}", key))),
        };
        value.ok_or_else(|| Error::InvalidState(format!("option '{}' is not set", key)))
    }

    /// Apply many options at once, stopping at the first invalid one.
    pub fn set_options<'a>(
        &mut self,
        options: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<()> {
        for (key, value) in options {
            self.set_option(key, value)?;
        }
        Ok(())
    }

    /// Build the REST backend without wrapping it in a client.
    pub fn build_backend(&self) -> Result<Arc<dyn KustoBackend>> {
        let http_client = self.build_http_client()?;
        self.backend_over(http_client)
    }

    fn backend_over(&self, http_client: Arc<KustoHttpClient>) -> Result<Arc<dyn KustoBackend>> {
        let cluster_url = self
            .cluster_url
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("cluster_url not set"))?;
        if !cluster_url.starts_with("https://") && !cluster_url.starts_with("http://") {
            return Err(Error::invalid_argument(format!(
                "cluster_url must be an http(s) URL: {}",
                cluster_url
            )));
        }
        debug!("Creating client for {}", cluster_url);

        let mut backend = RestBackend::new(http_client, cluster_url.clone());
        if let Some(ref app) = self.application {
            backend = backend.with_application(app.clone());
        }
        if let Some(ref user) = self.user {
            backend = backend.with_user(user.clone());
        }
        Ok(Arc::new(backend))
    }

    /// Build the shared HTTP client, e.g. for an
    /// [`HttpBlobStore`](crate::ingest::HttpBlobStore).
    pub fn build_http_client(&self) -> Result<Arc<KustoHttpClient>> {
        let auth_provider = self
            .auth_provider
            .clone()
            .ok_or_else(|| Error::invalid_argument("access_token not set"))?;
        init_logging(&self.log_config);
        Ok(Arc::new(KustoHttpClient::new(
            self.http_config.clone(),
            auth_provider,
        )?))
    }

    /// Build an async client.
    pub fn build(&self) -> Result<KustoClient> {
        Ok(KustoClient::new(self.build_backend()?))
    }

    /// Build a queued ingest client backed by Azure Queue Storage and
    /// SAS-authorized blob uploads. `cluster_url` must be the ingestion
    /// endpoint (`https://ingest-{cluster}...`).
    pub fn build_queued_ingest_client(&self) -> Result<QueuedIngestClient> {
        let http_client = self.build_http_client()?;
        let backend = self.backend_over(http_client.clone())?;
        Ok(QueuedIngestClient::with_http(
            KustoClient::new(backend),
            http_client,
        ))
    }

    /// Build a blocking client with its own runtime.
    pub fn build_blocking(&self) -> Result<BlockingKustoClient> {
        BlockingKustoClient::new(self.build_backend()?)
    }
}

fn invalid_option(key: &str, value: &str) -> Error {
    Error::invalid_argument(format!("Invalid value for {}: {}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_options() {
        let mut builder = ClientBuilder::new();
        builder
            .set_options([
                (CLUSTER_URL_OPTION, "https://help.kusto.windows.net"),
                (ACCESS_TOKEN_OPTION, "token"),
                (CONNECT_TIMEOUT_OPTION, "5000"),
                (MAX_RETRIES_OPTION, "7"),
                (LOG_LEVEL_OPTION, "DEBUG"),
            ])
            .unwrap();

        assert_eq!(builder.cluster_url(), Some("https://help.kusto.windows.net"));
        assert_eq!(builder.http_config().connect_timeout, Duration::from_secs(5));
        assert_eq!(builder.http_config().max_retries, 7);
        assert_eq!(builder.get_option(MAX_RETRIES_OPTION).unwrap(), "7");
        assert_eq!(builder.log_config().level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_invalid_options() {
        let mut builder = ClientBuilder::new();
        assert!(builder.set_option("kusto.nope", "x").is_err());
        assert!(builder.set_option(READ_TIMEOUT_OPTION, "soon").is_err());
        assert!(builder.set_option(LOG_LEVEL_OPTION, "loud").is_err());
        assert!(matches!(
            builder.get_option(APPLICATION_OPTION),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_build_requires_url_and_token() {
        let missing_url = ClientBuilder::new().with_access_token("t");
        assert!(matches!(
            missing_url.build_backend(),
            Err(Error::InvalidArgument(_))
        ));

        let missing_token = ClientBuilder::new().with_cluster_url("https://x.kusto.windows.net");
        assert!(matches!(
            missing_token.build_backend(),
            Err(Error::InvalidArgument(_))
        ));

        let bad_scheme = ClientBuilder::new()
            .with_cluster_url("ftp://x")
            .with_access_token("t");
        assert!(bad_scheme.build_backend().is_err());
    }

    #[tokio::test]
    async fn test_build_client() {
        let client = ClientBuilder::new()
            .with_cluster_url("https://help.kusto.windows.net")
            .with_access_token("t")
            .with_application("tests")
            .build()
            .unwrap();
        assert_eq!(client.cluster_url(), "https://help.kusto.windows.net");
    }

    #[tokio::test]
    async fn test_build_queued_ingest_client() {
        let client = ClientBuilder::new()
            .with_cluster_url("https://ingest-help.kusto.windows.net")
            .with_access_token("t")
            .build_queued_ingest_client()
            .unwrap();
        assert_eq!(
            client.resource_manager().client().cluster_url(),
            "https://ingest-help.kusto.windows.net"
        );
        assert!(format!("{:?}", client).contains("AzureQueueService"));

        assert!(ClientBuilder::new()
            .with_access_token("t")
            .build_queued_ingest_client()
            .is_err());
    }
}
