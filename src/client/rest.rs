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

//! REST backend over the query, management and streaming-ingest endpoints.

use crate::client::http::Idempotency;
use crate::client::{Endpoint, KustoBackend, KustoHttpClient, KustoRequest, StreamingIngestRequest};
use crate::error::{Error, Result};
use crate::result::parse_error_body;
use crate::types::ClientRequestProperties;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Method, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
pub const CLIENT_VERSION_HEADER: &str = "x-ms-client-version";
pub const APPLICATION_HEADER: &str = "x-ms-app";
pub const USER_HEADER: &str = "x-ms-user";

/// Client-side allowance on top of a request's `servertimeout`.
const SERVER_TIMEOUT_HEADROOM: Duration = Duration::from_secs(30);

/// Value sent as `x-ms-client-version`.
pub fn client_version() -> String {
    format!("Kusto.Rust.Client:{}", env!("CARGO_PKG_VERSION"))
}

/// Backend that talks to a cluster over HTTPS.
pub struct RestBackend {
    http_client: Arc<KustoHttpClient>,
    cluster_url: String,
    application: Option<String>,
    user: Option<String>,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("cluster_url", &self.cluster_url)
            .field("application", &self.application)
            .field("user", &self.user)
            .finish()
    }
}

impl RestBackend {
    pub fn new(http_client: Arc<KustoHttpClient>, cluster_url: impl Into<String>) -> Self {
        Self {
            http_client,
            cluster_url: cluster_url.into(),
            application: None,
            user: None,
        }
    }

    /// Default `x-ms-app` value, overridable per request.
    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Default `x-ms-user` value, overridable per request.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    fn base_url(&self) -> &str {
        self.cluster_url.trim_end_matches('/')
    }

    /// Send and translate HTTP failures into service errors where possible.
    async fn send(&self, request: reqwest::Request, idempotency: Idempotency) -> Result<Response> {
        let result = match idempotency {
            Idempotency::Idempotent => self.http_client.execute(request).await,
            Idempotency::NonIdempotent => self.http_client.execute_non_idempotent(request).await,
        };
        match result {
            Err(Error::Http { status, body }) => Err(parse_error_body(status, &body)),
            other => other,
        }
    }
}

#[async_trait]
impl KustoBackend for RestBackend {
    fn cluster_url(&self) -> &str {
        &self.cluster_url
    }

    async fn execute(&self, request: &KustoRequest) -> Result<String> {
        let url = format!("{}{}", self.base_url(), request.endpoint.path());
        let client_request_id = request.client_request_id();
        let properties = request.properties.as_ref();
        let application = properties
            .and_then(|p| p.application.as_ref())
            .or(self.application.as_ref());
        let user = properties
            .and_then(|p| p.user.as_ref())
            .or(self.user.as_ref());

        debug!(
            "Executing on {} (db={}, request id={}): {}",
            url, request.database, client_request_id, request.text
        );

        let mut builder = self
            .http_client
            .inner()
            .request(Method::POST, &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(CLIENT_REQUEST_ID_HEADER, &client_request_id)
            .header(CLIENT_VERSION_HEADER, client_version());
        if let Some(app) = application {
            builder = builder.header(APPLICATION_HEADER, app);
        }
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        if let Some(timeout) = request_timeout(self.http_client.config().read_timeout, properties) {
            debug!("Extending client timeout to {:?}", timeout);
            builder = builder.timeout(timeout);
        }
        let http_request = builder.json(&request.body()).build()?;

        // Management commands may change state; queries only read.
        let idempotency = match request.endpoint {
            Endpoint::Query => Idempotency::Idempotent,
            Endpoint::Management => Idempotency::NonIdempotent,
        };
        let response = self.send(http_request, idempotency).await?;
        let body = response.text().await?;

        debug!(
            "Response for request id {}: {} bytes",
            client_request_id,
            body.len()
        );
        Ok(body)
    }

    async fn stream_ingest(&self, request: &StreamingIngestRequest) -> Result<String> {
        let url = format!(
            "{}/v1/rest/ingest/{}/{}",
            self.base_url(),
            request.database,
            request.table
        );
        let client_request_id = request
            .client_request_id
            .clone()
            .unwrap_or_else(|| format!("KRC.executeStreamingIngest;{}", Uuid::new_v4()));

        let mut query = vec![("streamFormat", request.format.as_str().to_string())];
        if let Some(ref mapping) = request.mapping_name {
            query.push(("mappingName", mapping.clone()));
        }

        debug!(
            "Streaming {} bytes into {}.{} (request id={})",
            request.data.len(),
            request.database,
            request.table,
            client_request_id
        );

        let mut builder = self
            .http_client
            .inner()
            .request(Method::POST, &url)
            .query(&query)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CLIENT_REQUEST_ID_HEADER, &client_request_id)
            .header(CLIENT_VERSION_HEADER, client_version());
        if request.compressed {
            builder = builder.header(CONTENT_ENCODING, "gzip");
        }
        if let Some(ref app) = self.application {
            builder = builder.header(APPLICATION_HEADER, app);
        }
        if let Some(ref user) = self.user {
            builder = builder.header(USER_HEADER, user);
        }
        let http_request = builder.body(request.data.clone()).build()?;

        let response = self.send(http_request, Idempotency::NonIdempotent).await?;
        Ok(response.text().await?)
    }
}

/// Timeout for one request: the server-side timeout plus headroom, when
/// that is longer than the client's default.
fn request_timeout(
    read_timeout: Duration,
    properties: Option<&ClientRequestProperties>,
) -> Option<Duration> {
    let timeout = properties?.server_timeout? + SERVER_TIMEOUT_HEADROOM;
    (timeout > read_timeout).then_some(timeout)
}
