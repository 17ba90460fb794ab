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

//! Async query client.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{Endpoint, KustoBackend, KustoRequest, StreamingIngestRequest};
use crate::error::{Error, Result};
use crate::result::{apply_partial_failure_policy, parse_response, KustoResponseDataSet};
use crate::types::ClientRequestProperties;

/// Executes queries and management commands against one cluster.
///
/// Cheap to clone; clones share the backend and its connection pool.
#[derive(Debug, Clone)]
pub struct KustoClient {
    backend: Arc<dyn KustoBackend>,
}

impl KustoClient {
    pub fn new(backend: Arc<dyn KustoBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn KustoBackend> {
        &self.backend
    }

    pub fn cluster_url(&self) -> &str {
        self.backend.cluster_url()
    }

    /// Execute a query or, if `text` starts with `.`, a management command.
    pub async fn execute(
        &self,
        database: &str,
        text: &str,
        properties: Option<&ClientRequestProperties>,
    ) -> Result<KustoResponseDataSet> {
        self.run(Endpoint::for_text(text), database, text, properties)
            .await
    }

    /// Execute a query on the V2 query endpoint.
    pub async fn execute_query(
        &self,
        database: &str,
        query: &str,
        properties: Option<&ClientRequestProperties>,
    ) -> Result<KustoResponseDataSet> {
        self.run(Endpoint::Query, database, query, properties).await
    }

    /// Execute a management command on the V1 endpoint.
    pub async fn execute_mgmt(
        &self,
        database: &str,
        command: &str,
        properties: Option<&ClientRequestProperties>,
    ) -> Result<KustoResponseDataSet> {
        self.run(Endpoint::Management, database, command, properties)
            .await
    }

    /// Like [`execute`](Self::execute), but gives up with
    /// [`Error::Cancelled`] as soon as `token` is cancelled. The in-flight
    /// request is dropped; no client state is left behind.
    pub async fn execute_with_cancellation(
        &self,
        database: &str,
        text: &str,
        properties: Option<&ClientRequestProperties>,
        token: &CancellationToken,
    ) -> Result<KustoResponseDataSet> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Request cancelled by caller");
                Err(Error::Cancelled)
            }
            result = self.execute(database, text, properties) => result,
        }
    }

    /// Post data to the streaming-ingest endpoint.
    pub async fn execute_streaming_ingest(
        &self,
        request: &StreamingIngestRequest,
    ) -> Result<KustoResponseDataSet> {
        let body = self.backend.stream_ingest(request).await?;
        decode_response(Endpoint::Management, &body, None)
    }

    async fn run(
        &self,
        endpoint: Endpoint,
        database: &str,
        text: &str,
        properties: Option<&ClientRequestProperties>,
    ) -> Result<KustoResponseDataSet> {
        let request = build_request(endpoint, database, text, properties)?;
        let body = self.backend.execute(&request).await?;
        decode_response(endpoint, &body, properties)
    }
}

pub(crate) fn build_request(
    endpoint: Endpoint,
    database: &str,
    text: &str,
    properties: Option<&ClientRequestProperties>,
) -> Result<KustoRequest> {
    if text.trim().is_empty() {
        return Err(Error::invalid_argument("Query text must not be empty"));
    }
    Ok(KustoRequest::new(
        endpoint,
        database,
        text,
        properties.cloned(),
    ))
}

/// Parse a raw body and apply the partial-failure policy.
pub(crate) fn decode_response(
    endpoint: Endpoint,
    body: &str,
    properties: Option<&ClientRequestProperties>,
) -> Result<KustoResponseDataSet> {
    let dataset = parse_response(body, endpoint.response_version())?;
    apply_partial_failure_policy(dataset, properties)
}
