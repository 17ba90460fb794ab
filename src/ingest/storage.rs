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

//! Storage seams used by the ingest clients.
//!
//! Queue and blob semantics belong to the storage service. The clients only
//! need the operations below, so the storage backend is pluggable.
//! `AzureQueueService` (in [`queue`](crate::ingest::queue)) talks to Azure
//! Queue Storage, `InMemoryQueueService` serves tests and local runs, and
//! `HttpBlobStore` uploads SAS-authorized block blobs.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::client::{Idempotency, KustoHttpClient};
use crate::error::{Error, Result};
use crate::ingest::resources::ResourceUri;

/// A message received from or peeked on a storage queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    /// Set on received messages; required to delete or release them.
    pub pop_receipt: Option<String>,
    /// Message text as stored (base64 for ingestion queues).
    pub content: String,
    pub dequeue_count: u32,
}

/// Operations on storage queues.
///
/// Received messages are hidden from other consumers until deleted or
/// released.
#[async_trait]
pub trait QueueService: Send + Sync + fmt::Debug {
    async fn put_message(&self, queue: &ResourceUri, content: &str) -> Result<()>;

    /// Look at up to `count` visible messages without hiding them.
    async fn peek_messages(&self, queue: &ResourceUri, count: usize) -> Result<Vec<QueueMessage>>;

    /// Receive and hide up to `count` messages.
    async fn receive_messages(
        &self,
        queue: &ResourceUri,
        count: usize,
    ) -> Result<Vec<QueueMessage>>;

    /// Permanently remove a received message.
    async fn delete_message(&self, queue: &ResourceUri, message: &QueueMessage) -> Result<()>;

    /// Make a received message visible again.
    async fn release_message(&self, queue: &ResourceUri, message: &QueueMessage) -> Result<()>;
}

/// Blob upload to a container.
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Upload `data` as `blob_name` and return its URI, SAS included.
    async fn upload(
        &self,
        container: &ResourceUri,
        blob_name: &str,
        data: Vec<u8>,
    ) -> Result<String>;
}

#[derive(Debug, Default)]
struct QueueState {
    visible: VecDeque<QueueMessage>,
    invisible: HashMap<String, QueueMessage>,
}

/// Process-local queues keyed by queue URI.
#[derive(Debug, Default)]
pub struct InMemoryQueueService {
    queues: Mutex<HashMap<String, QueueState>>,
}

impl InMemoryQueueService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of visible messages.
    pub async fn visible_count(&self, queue: &ResourceUri) -> usize {
        let queues = self.queues.lock().await;
        queues
            .get(&queue.uri())
            .map(|q| q.visible.len())
            .unwrap_or(0)
    }

    /// Number of received messages not yet deleted or released.
    pub async fn in_flight_count(&self, queue: &ResourceUri) -> usize {
        let queues = self.queues.lock().await;
        queues
            .get(&queue.uri())
            .map(|q| q.invisible.len())
            .unwrap_or(0)
    }

    /// Make every received, unacknowledged message visible again, as if
    /// their visibility timeout expired.
    pub async fn expire_visibility(&self) {
        let mut queues = self.queues.lock().await;
        for state in queues.values_mut() {
            let expired: Vec<QueueMessage> = state.invisible.drain().map(|(_, m)| m).collect();
            state.visible.extend(expired);
        }
    }
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn put_message(&self, queue: &ResourceUri, content: &str) -> Result<()> {
        let mut queues = self.queues.lock().await;
        queues
            .entry(queue.uri())
            .or_default()
            .visible
            .push_back(QueueMessage {
                id: Uuid::new_v4().to_string(),
                pop_receipt: None,
                content: content.to_string(),
                dequeue_count: 0,
            });
        Ok(())
    }

    async fn peek_messages(&self, queue: &ResourceUri, count: usize) -> Result<Vec<QueueMessage>> {
        let queues = self.queues.lock().await;
        Ok(queues
            .get(&queue.uri())
            .map(|q| q.visible.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }

    async fn receive_messages(
        &self,
        queue: &ResourceUri,
        count: usize,
    ) -> Result<Vec<QueueMessage>> {
        let mut queues = self.queues.lock().await;
        let Some(state) = queues.get_mut(&queue.uri()) else {
            return Ok(Vec::new());
        };

        let mut received = Vec::new();
        while received.len() < count {
            let Some(mut message) = state.visible.pop_front() else {
                break;
            };
            let receipt = Uuid::new_v4().to_string();
            message.pop_receipt = Some(receipt.clone());
            message.dequeue_count += 1;
            state.invisible.insert(receipt, message.clone());
            received.push(message);
        }
        Ok(received)
    }

    async fn delete_message(&self, queue: &ResourceUri, message: &QueueMessage) -> Result<()> {
        let mut queues = self.queues.lock().await;
        let removed = queues
            .get_mut(&queue.uri())
            .zip(message.pop_receipt.as_ref())
            .and_then(|(state, receipt)| state.invisible.remove(receipt));
        match removed {
            Some(_) => Ok(()),
            None => Err(Error::InvalidState(format!(
                "Message {} is not in flight on {}",
                message.id, queue
            ))),
        }
    }

    async fn release_message(&self, queue: &ResourceUri, message: &QueueMessage) -> Result<()> {
        let mut queues = self.queues.lock().await;
        let state = queues.get_mut(&queue.uri());
        let released = state
            .zip(message.pop_receipt.as_ref())
            .and_then(|(state, receipt)| {
                let released = state.invisible.remove(receipt)?;
                state.visible.push_back(released);
                Some(())
            });
        released.ok_or_else(|| {
            Error::InvalidState(format!(
                "Message {} is not in flight on {}",
                message.id, queue
            ))
        })
    }
}

/// Uploads block blobs with the container's SAS token.
#[derive(Debug)]
pub struct HttpBlobStore {
    http_client: Arc<KustoHttpClient>,
}

impl HttpBlobStore {
    pub fn new(http_client: Arc<KustoHttpClient>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(
        &self,
        container: &ResourceUri,
        blob_name: &str,
        data: Vec<u8>,
    ) -> Result<String> {
        let url = container.child_uri_with_sas(blob_name);
        debug!("Uploading {} bytes to {}/{}", data.len(), container, blob_name);

        let request = self
            .http_client
            .inner()
            .request(Method::PUT, &url)
            .header("x-ms-blob-type", "BlockBlob")
            .body(data)
            .build()?;
        self.http_client
            .execute_without_auth(request, Idempotency::Idempotent)
            .await?;
        Ok(url)
    }
}
