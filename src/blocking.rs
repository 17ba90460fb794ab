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

//! Blocking query client.
//!
//! Wraps the same backend, parser and partial-failure policy as
//! [`KustoClient`](crate::kusto::KustoClient) and drives the network call on
//! a private tokio runtime. Must not be used from inside an async context.

use std::sync::Arc;

use crate::client::{Endpoint, KustoBackend, StreamingIngestRequest};
use crate::error::Result;
use crate::kusto::{build_request, decode_response};
use crate::result::KustoResponseDataSet;
use crate::types::ClientRequestProperties;

#[derive(Debug)]
pub struct BlockingKustoClient {
    backend: Arc<dyn KustoBackend>,
    // Tokio runtime for async operations
    runtime: tokio::runtime::Runtime,
}

impl BlockingKustoClient {
    pub fn new(backend: Arc<dyn KustoBackend>) -> Result<Self> {
        let runtime = tokio::runtime::Runtime::new()?;
        Ok(Self { backend, runtime })
    }

    pub fn cluster_url(&self) -> &str {
        self.backend.cluster_url()
    }

    /// Execute a query or, if `text` starts with `.`, a management command.
    pub fn execute(
        &self,
        database: &str,
        text: &str,
        properties: Option<&ClientRequestProperties>,
    ) -> Result<KustoResponseDataSet> {
        self.run(Endpoint::for_text(text), database, text, properties)
    }

    pub fn execute_query(
        &self,
        database: &str,
        query: &str,
        properties: Option<&ClientRequestProperties>,
    ) -> Result<KustoResponseDataSet> {
        self.run(Endpoint::Query, database, query, properties)
    }

    pub fn execute_mgmt(
        &self,
        database: &str,
        command: &str,
        properties: Option<&ClientRequestProperties>,
    ) -> Result<KustoResponseDataSet> {
        self.run(Endpoint::Management, database, command, properties)
    }

    pub fn execute_streaming_ingest(
        &self,
        request: &StreamingIngestRequest,
    ) -> Result<KustoResponseDataSet> {
        let body = self.runtime.block_on(self.backend.stream_ingest(request))?;
        decode_response(Endpoint::Management, &body, None)
    }

    fn run(
        &self,
        endpoint: Endpoint,
        database: &str,
        text: &str,
        properties: Option<&ClientRequestProperties>,
    ) -> Result<KustoResponseDataSet> {
        let request = build_request(endpoint, database, text, properties)?;
        let body = self.runtime.block_on(self.backend.execute(&request))?;
        decode_response(endpoint, &body, properties)
    }
}
