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

//! Queued ingestion.
//!
//! Data is placed in a storage blob and a message pointing at it is posted
//! to one of the service's ingestion queues. The service batches and loads
//! it asynchronously; outcomes are reported through the status queues.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::client::KustoHttpClient;
use crate::error::{Error, Result};
use crate::ingest::descriptors::{BlobDescriptor, FileDescriptor, StreamDescriptor};
use crate::ingest::gzip;
use crate::ingest::message::IngestionBlobInfo;
use crate::ingest::properties::IngestionProperties;
use crate::ingest::queue::AzureQueueService;
use crate::ingest::resources::{ResourceManager, ResourceUri};
use crate::ingest::status::KustoIngestStatusQueues;
use crate::ingest::storage::{BlobStore, HttpBlobStore, QueueService};
use crate::kusto::KustoClient;

/// State of an ingestion as known to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStatus {
    /// Posted to an ingestion queue; the outcome arrives later.
    Queued,
    /// Accepted synchronously by the streaming endpoint.
    Succeeded,
}

/// Returned by every ingest call.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionResult {
    pub status: IngestionStatus,
    pub database: String,
    pub table: String,
    pub source_id: Uuid,
    /// Blob the service reads from, without its SAS token.
    pub blob_uri: Option<String>,
}

/// Client for queued ingestion through an ingestion endpoint.
#[derive(Debug)]
pub struct QueuedIngestClient {
    resource_manager: ResourceManager,
    queue_service: Arc<dyn QueueService>,
    blob_store: Arc<dyn BlobStore>,
    next_queue: AtomicUsize,
    next_container: AtomicUsize,
}

impl QueuedIngestClient {
    /// `client` must point at the ingestion endpoint of the cluster.
    pub fn new(
        client: KustoClient,
        queue_service: Arc<dyn QueueService>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self::with_resource_manager(ResourceManager::new(client), queue_service, blob_store)
    }

    /// Queued ingestion through Azure Queue Storage, uploading local data
    /// with [`HttpBlobStore`].
    pub fn with_http(client: KustoClient, http_client: Arc<KustoHttpClient>) -> Self {
        Self::new(
            client,
            Arc::new(AzureQueueService::new(http_client.clone())),
            Arc::new(HttpBlobStore::new(http_client)),
        )
    }

    pub fn with_resource_manager(
        resource_manager: ResourceManager,
        queue_service: Arc<dyn QueueService>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            resource_manager,
            queue_service,
            blob_store,
            next_queue: AtomicUsize::new(0),
            next_container: AtomicUsize::new(0),
        }
    }

    pub fn resource_manager(&self) -> &ResourceManager {
        &self.resource_manager
    }

    /// Queue ingestion of a blob that is already in storage.
    pub async fn ingest_from_blob(
        &self,
        blob: BlobDescriptor,
        properties: &IngestionProperties,
    ) -> Result<IngestionResult> {
        properties.validate()?;
        let resources = self.resource_manager.resources().await?;
        resources.validate_for_ingestion()?;
        let queue = pick(
            &resources.secured_ready_for_aggregation_queues,
            &self.next_queue,
        )?;

        let token = self.resource_manager.authorization_context().await?;
        let message = IngestionBlobInfo::new(&blob, properties).with_authorization_context(token);

        debug!(
            "Queueing ingestion {} of {} into {}.{}",
            message.id, queue, properties.database_name, properties.table_name
        );
        self.queue_service
            .put_message(queue, &message.to_queue_message()?)
            .await?;
        info!(
            "Queued ingestion {} into {}.{}",
            message.id, properties.database_name, properties.table_name
        );

        Ok(IngestionResult {
            status: IngestionStatus::Queued,
            database: properties.database_name.clone(),
            table: properties.table_name.clone(),
            source_id: blob.source_id,
            blob_uri: Some(strip_query(&message.blob_path)),
        })
    }

    /// Upload a local file to temporary storage and queue it.
    ///
    /// Uncompressed files are gzipped first when the format allows it.
    pub async fn ingest_from_file(
        &self,
        file: FileDescriptor,
        properties: &IngestionProperties,
    ) -> Result<IngestionResult> {
        properties.validate()?;
        let raw_size = file.raw_size().await?;
        let data = tokio::fs::read(&file.path).await?;
        let blob_name = file.blob_name(
            &properties.database_name,
            &properties.table_name,
            properties.data_format,
        );
        let data = if !file.is_compressed() && properties.data_format.is_compressible() {
            gzip(&data)?
        } else {
            data
        };

        let blob_uri = self.upload(&blob_name, data).await?;
        let blob = BlobDescriptor::new(blob_uri, Some(raw_size), Some(file.source_id));
        self.ingest_from_blob(blob, properties).await
    }

    /// Upload in-memory data to temporary storage and queue it.
    pub async fn ingest_from_stream(
        &self,
        stream: StreamDescriptor,
        properties: &IngestionProperties,
    ) -> Result<IngestionResult> {
        properties.validate()?;
        if stream.data.is_empty() {
            return Err(Error::invalid_argument("Stream is empty"));
        }
        let raw_size = stream.raw_size();
        let stream = if !stream.compressed && properties.data_format.is_compressible() {
            StreamDescriptor::new(gzip(&stream.data)?, true, Some(stream.source_id))
        } else {
            stream
        };
        let blob_name = stream.blob_name(
            &properties.database_name,
            &properties.table_name,
            properties.data_format,
        );

        let blob_uri = self.upload(&blob_name, stream.data).await?;
        let blob = BlobDescriptor::new(blob_uri, raw_size, Some(stream.source_id));
        self.ingest_from_blob(blob, properties).await
    }

    /// The success and failure queues reported by the ingestion endpoint.
    pub async fn status_queues(&self) -> Result<KustoIngestStatusQueues> {
        let resources = self.resource_manager.resources().await?;
        Ok(KustoIngestStatusQueues::new(
            &resources,
            self.queue_service.clone(),
        ))
    }

    async fn upload(&self, blob_name: &str, data: Vec<u8>) -> Result<String> {
        let resources = self.resource_manager.resources().await?;
        resources.validate_for_ingestion()?;
        let container = pick(&resources.temp_storage, &self.next_container)?;
        self.blob_store.upload(container, blob_name, data).await
    }
}

/// Round-robin over `items`.
fn pick<'a>(items: &'a [ResourceUri], counter: &AtomicUsize) -> Result<&'a ResourceUri> {
    if items.is_empty() {
        return Err(Error::InvalidState("No storage resources available".to_string()));
    }
    let idx = counter.fetch_add(1, Ordering::Relaxed) % items.len();
    Ok(&items[idx])
}

fn strip_query(uri: &str) -> String {
    uri.split(['?', ';']).next().unwrap_or(uri).to_string()
}
