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

//! Transport layer for the Kusto REST endpoints.
//!
//! This module provides:
//! - `KustoBackend` trait: the seam between the clients and the wire
//! - `KustoHttpClient`: Low-level HTTP client with retry logic
//! - `RestBackend`: Implementation over the REST query, management and
//!   streaming-ingest endpoints

pub mod http;
pub mod rest;

use crate::error::Result;
use crate::ingest::DataFormat;
use crate::result::ResponseVersion;
use crate::types::{ClientRequestProperties, QueryRequestBody};
use async_trait::async_trait;
use uuid::Uuid;

pub use http::{HttpClientConfig, Idempotency, KustoHttpClient};
pub use rest::RestBackend;

/// Which REST endpoint a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/v2/rest/query`
    Query,
    /// `/v1/rest/mgmt`
    Management,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Query => "/v2/rest/query",
            Endpoint::Management => "/v1/rest/mgmt",
        }
    }

    /// Frame protocol spoken by this endpoint.
    pub fn response_version(&self) -> ResponseVersion {
        match self {
            Endpoint::Query => ResponseVersion::V2,
            Endpoint::Management => ResponseVersion::V1,
        }
    }

    /// Management commands start with a dot.
    pub fn for_text(text: &str) -> Self {
        if text.trim_start().starts_with('.') {
            Endpoint::Management
        } else {
            Endpoint::Query
        }
    }
}

/// A single query or management command.
#[derive(Debug, Clone)]
pub struct KustoRequest {
    pub endpoint: Endpoint,
    pub database: String,
    pub text: String,
    pub properties: Option<ClientRequestProperties>,
}

impl KustoRequest {
    pub fn new(
        endpoint: Endpoint,
        database: impl Into<String>,
        text: impl Into<String>,
        properties: Option<ClientRequestProperties>,
    ) -> Self {
        Self {
            endpoint,
            database: database.into(),
            text: text.into(),
            properties,
        }
    }

    /// JSON body posted to the endpoint.
    pub fn body(&self) -> QueryRequestBody {
        QueryRequestBody {
            db: self.database.clone(),
            csl: self.text.clone(),
            properties: self.properties.as_ref().map(ClientRequestProperties::to_json),
        }
    }

    /// Caller-supplied request id, or a fresh `KRC.execute;<uuid>`.
    pub fn client_request_id(&self) -> String {
        self.properties
            .as_ref()
            .and_then(|p| p.client_request_id.clone())
            .unwrap_or_else(|| format!("KRC.execute;{}", Uuid::new_v4()))
    }
}

/// Raw data posted to the streaming-ingest endpoint.
#[derive(Debug, Clone)]
pub struct StreamingIngestRequest {
    pub database: String,
    pub table: String,
    pub format: DataFormat,
    pub mapping_name: Option<String>,
    pub data: Vec<u8>,
    /// Body is gzip-compressed.
    pub compressed: bool,
    pub client_request_id: Option<String>,
}

/// Abstract interface between the clients and the service.
///
/// Implementations only move bytes: they return the raw response body and
/// leave parsing and the partial-failure policy to the caller, so both the
/// async and blocking clients share one decoding path.
#[async_trait]
pub trait KustoBackend: Send + Sync + std::fmt::Debug {
    /// Base URL of the cluster this backend talks to.
    fn cluster_url(&self) -> &str;

    /// Execute a query or management command and return the response body.
    ///
    /// Service error payloads must be surfaced as
    /// [`Error::Service`](crate::error::Error::Service).
    async fn execute(&self, request: &KustoRequest) -> Result<String>;

    /// Post data to the streaming-ingest endpoint and return the V1 body.
    async fn stream_ingest(&self, request: &StreamingIngestRequest) -> Result<String>;
}
