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

//! Query and ingestion client for KQL data platforms
//!
//! This crate talks to a cluster's REST endpoints: it runs queries and
//! management commands, turns the response frames into typed tables, and
//! queues or streams data for ingestion.
//!
//! ## Overview
//!
//! - [`KustoClient`] - async client; [`BlockingKustoClient`] wraps the same
//!   decoding path behind a private runtime
//! - [`ClientBuilder`] - typed and string-keyed configuration
//! - [`result`] - response parsing, value decoding and the partial-failure
//!   policy
//! - [`ingest`] - queued and streaming ingestion plus the status queues
//!
//! ## Example
//!
//! ```ignore
//! use kusto_client::{ClientBuilder, ClientRequestProperties};
//!
//! let client = ClientBuilder::new()
//!     .with_cluster_url("https://mycluster.kusto.windows.net")
//!     .with_access_token("eyJ0...")
//!     .build()?;
//!
//! let dataset = client
//!     .execute("Samples", "StormEvents | take 10", None)
//!     .await?;
//! if let Some(table) = dataset.primary_result() {
//!     for row in table.rows() {
//!         println!("{:?}", row.get("State"));
//!     }
//! }
//! ```
//!
//! ## Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `kusto.cluster_url` | | Cluster URL |
//! | `kusto.access_token` | | Bearer token |
//! | `kusto.application` | | `x-ms-app` header |
//! | `kusto.user` | | `x-ms-user` header |
//! | `kusto.http.connect_timeout_ms` | 30000 | Connect timeout |
//! | `kusto.http.read_timeout_ms` | 270000 | Read timeout |
//! | `kusto.http.max_retries` | 3 | Retries on throttling and transport errors |
//! | `kusto.http.retry_delay_ms` | 1500 | Base retry delay, doubled per attempt |
//! | `kusto.log_level` | | `off`, `error`, `warn`, `info`, `debug`, `trace` |
//! | `kusto.log_file` | | Log to this file instead of stderr |

pub mod auth;
pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod kusto;
pub mod logging;
pub mod result;
pub mod types;

pub use auth::{AccessToken, AuthProvider, TokenCallback};
pub use blocking::BlockingKustoClient;
pub use client::{Endpoint, HttpClientConfig, KustoBackend, KustoHttpClient, RestBackend};
pub use config::ClientBuilder;
pub use error::{Error, Result, ServiceError};
pub use kusto::KustoClient;
pub use result::{
    Column, ColumnType, DynamicValue, FailureSource, KustoResponseDataSet, KustoValue,
    PartialFailure, ResponseVersion, ResultTable, RowView,
};
pub use types::{ClientRequestProperties, TableKind};
