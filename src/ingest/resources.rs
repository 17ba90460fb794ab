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

//! Service-provided ingestion resources.
//!
//! The ingestion endpoint hands out the storage queues and containers to
//! use through `.get ingestion resources`, and an identity token through
//! `.get kusto identity token`. Both are cached for an hour.

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::kusto::KustoClient;
use crate::result::{KustoResponseDataSet, ResultTable};

const RESOURCES_COMMAND: &str = ".get ingestion resources";
const IDENTITY_TOKEN_COMMAND: &str = ".get kusto identity token";
const DEFAULT_DATABASE: &str = "NetDefaultDB";
const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60 * 60);

/// A storage object URI with its SAS token split off.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    service_uri: String,
    account_name: String,
    object_name: String,
    sas_token: Option<String>,
}

impl ResourceUri {
    /// Parse `https://{account}.{queue|blob}.core.windows.net/{object}?{sas}`.
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| Error::parse(format!("Invalid resource URI {}: {}", uri, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::parse(format!("Resource URI has no host: {}", uri)))?;
        let account_name = host.split('.').next().unwrap_or(host).to_string();
        let object_name = url.path().trim_matches('/').to_string();
        if object_name.is_empty() {
            return Err(Error::parse(format!(
                "Resource URI has no object name: {}",
                uri
            )));
        }
        let service_uri = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        Ok(Self {
            service_uri,
            account_name,
            object_name,
            sas_token: url.query().filter(|q| !q.is_empty()).map(str::to_string),
        })
    }

    pub fn service_uri(&self) -> &str {
        &self.service_uri
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Queue or container name.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn sas_token(&self) -> Option<&str> {
        self.sas_token.as_deref()
    }

    /// Object URI without credentials.
    pub fn uri(&self) -> String {
        format!("{}/{}", self.service_uri, self.object_name)
    }

    /// URI of a child object (a blob in a container), with the SAS attached.
    pub fn child_uri_with_sas(&self, name: &str) -> String {
        match self.sas_token {
            Some(ref sas) => format!("{}/{}?{}", self.uri(), name, sas),
            None => format!("{}/{}", self.uri(), name),
        }
    }
}

// SAS tokens are credentials.
impl fmt::Debug for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceUri")
            .field("uri", &self.uri())
            .field("sas_token", &self.sas_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Storage resources returned by `.get ingestion resources`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestClientResources {
    pub secured_ready_for_aggregation_queues: Vec<ResourceUri>,
    pub failed_ingestions_queues: Vec<ResourceUri>,
    pub successful_ingestions_queues: Vec<ResourceUri>,
    pub temp_storage: Vec<ResourceUri>,
    pub status_tables: Vec<ResourceUri>,
}

impl IngestClientResources {
    /// Build from the `ResourceTypeName` / `StorageRoot` rows of the response.
    pub fn from_dataset(dataset: &KustoResponseDataSet) -> Result<Self> {
        let table = dataset
            .primary_result()
            .ok_or_else(|| Error::parse("Ingestion resources response has no primary result"))?;
        Self::from_table(table)
    }

    fn from_table(table: &ResultTable) -> Result<Self> {
        let type_idx = column(table, "ResourceTypeName")?;
        let root_idx = column(table, "StorageRoot")?;

        let mut resources = Self::default();
        for row in table.rows() {
            let (Some(kind), Some(root)) = (row[type_idx].as_str(), row[root_idx].as_str()) else {
                continue;
            };
            let target = match kind {
                "SecuredReadyForAggregationQueue" => {
                    &mut resources.secured_ready_for_aggregation_queues
                }
                "FailedIngestionsQueue" => &mut resources.failed_ingestions_queues,
                "SuccessfulIngestionsQueue" => &mut resources.successful_ingestions_queues,
                "TempStorage" => &mut resources.temp_storage,
                "IngestionsStatusTable" => &mut resources.status_tables,
                other => {
                    debug!("Ignoring ingestion resource type {}", other);
                    continue;
                }
            };
            target.push(ResourceUri::parse(root)?);
        }
        Ok(resources)
    }

    /// Ensure the resources needed to queue an ingestion were returned.
    pub fn validate_for_ingestion(&self) -> Result<()> {
        if self.secured_ready_for_aggregation_queues.is_empty() {
            return Err(Error::InvalidState(
                "No ingestion queues returned by the service".to_string(),
            ));
        }
        if self.temp_storage.is_empty() {
            return Err(Error::InvalidState(
                "No temporary storage returned by the service".to_string(),
            ));
        }
        Ok(())
    }
}

fn column(table: &ResultTable, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| Error::parse(format!("Missing column {} in {}", name, table.name())))
}

#[derive(Debug)]
struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

/// Fetches and caches ingestion resources and the identity token.
#[derive(Debug)]
pub struct ResourceManager {
    client: KustoClient,
    refresh_period: Duration,
    resources: Mutex<Option<Cached<IngestClientResources>>>,
    authorization_context: Mutex<Option<Cached<String>>>,
}

impl ResourceManager {
    pub fn new(client: KustoClient) -> Self {
        Self::with_refresh_period(client, DEFAULT_REFRESH_PERIOD)
    }

    pub fn with_refresh_period(client: KustoClient, refresh_period: Duration) -> Self {
        Self {
            client,
            refresh_period,
            resources: Mutex::new(None),
            authorization_context: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &KustoClient {
        &self.client
    }

    fn is_fresh<T>(&self, cached: &Option<Cached<T>>) -> bool {
        cached
            .as_ref()
            .is_some_and(|c| c.fetched_at.elapsed() < self.refresh_period)
    }

    /// Current ingestion resources, refreshed when older than the period.
    pub async fn resources(&self) -> Result<IngestClientResources> {
        let mut guard = self.resources.lock().await;
        if self.is_fresh(&guard) {
            if let Some(cached) = guard.as_ref() {
                return Ok(cached.value.clone());
            }
        }

        debug!("Fetching ingestion resources from {}", self.client.cluster_url());
        let dataset = self
            .client
            .execute_mgmt(DEFAULT_DATABASE, RESOURCES_COMMAND, None)
            .await?;
        let resources = IngestClientResources::from_dataset(&dataset)?;
        *guard = Some(Cached {
            value: resources.clone(),
            fetched_at: Instant::now(),
        });
        Ok(resources)
    }

    /// Identity token attached to queued ingestion messages.
    pub async fn authorization_context(&self) -> Result<String> {
        let mut guard = self.authorization_context.lock().await;
        if self.is_fresh(&guard) {
            if let Some(cached) = guard.as_ref() {
                return Ok(cached.value.clone());
            }
        }

        debug!("Fetching identity token from {}", self.client.cluster_url());
        let dataset = self
            .client
            .execute_mgmt(DEFAULT_DATABASE, IDENTITY_TOKEN_COMMAND, None)
            .await?;
        let table = dataset
            .primary_result()
            .ok_or_else(|| Error::parse("Identity token response has no primary result"))?;
        let idx = column(table, "AuthorizationContext")?;
        let token = table
            .row(0)
            .and_then(|row| row[idx].as_str().map(str::to_string))
            .ok_or_else(|| Error::parse("Identity token response is empty"))?;

        *guard = Some(Cached {
            value: token.clone(),
            fetched_at: Instant::now(),
        });
        Ok(token)
    }
}
