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
//! Azure Queue Storage over its REST API.
//!
//! Every request is signed by the queue's SAS token, so the bearer token of
//! the Kusto client is never attached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::escape::escape;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Deserialize;
use tracing::debug;

use crate::client::{Idempotency, KustoHttpClient};
use crate::error::{Error, Result};
use crate::ingest::resources::ResourceUri;
use crate::ingest::storage::{QueueMessage, QueueService};

const STORAGE_API_VERSION: &str = "2019-12-12";
/// Service limit for `numofmessages`.
const MAX_MESSAGES_PER_REQUEST: usize = 32;
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
struct QueueMessagesList {
    #[serde(rename = "QueueMessage", default)]
    messages: Vec<RawQueueMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawQueueMessage {
    message_id: String,
    #[serde(default)]
    pop_receipt: Option<String>,
    #[serde(default)]
    dequeue_count: u32,
    #[serde(default)]
    message_text: String,
}

impl From<RawQueueMessage> for QueueMessage {
    fn from(raw: RawQueueMessage) -> Self {
        Self {
            id: raw.message_id,
            pop_receipt: raw.pop_receipt,
            content: raw.message_text,
            dequeue_count: raw.dequeue_count,
        }
    }
}

fn parse_messages_list(body: &str) -> Result<Vec<QueueMessage>> {
    let list: QueueMessagesList = quick_xml::de::from_str(body)
        .map_err(|e| Error::parse(format!("Invalid queue messages list: {}", e)))?;
    Ok(list.messages.into_iter().map(QueueMessage::from).collect())
}

fn put_message_body(content: &str) -> String {
    format!(
        "<QueueMessage><MessageText>{}</MessageText></QueueMessage>",
        escape(content)
    )
}

/// `{queue}/messages[/{id}]?{sas}`
fn messages_url(queue: &ResourceUri, message_id: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&queue.uri())
        .map_err(|e| Error::InvalidArgument(format!("Invalid queue URI {}: {}", queue, e)))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::InvalidArgument(format!("Invalid queue URI {}", queue)))?;
        segments.pop_if_empty().push("messages");
        if let Some(id) = message_id {
            segments.push(id);
        }
    }
    url.set_query(queue.sas_token());
    Ok(url)
}

fn clamp_count(count: usize) -> String {
    count.clamp(1, MAX_MESSAGES_PER_REQUEST).to_string()
}

fn pop_receipt(message: &QueueMessage) -> Result<&str> {
    message.pop_receipt.as_deref().ok_or_else(|| {
        Error::InvalidState(format!("Message {} was not received", message.id))
    })
}

/// [`QueueService`] backed by Azure Queue Storage.
#[derive(Debug)]
pub struct AzureQueueService {
    http_client: Arc<KustoHttpClient>,
    visibility_timeout: Duration,
}

impl AzureQueueService {
    pub fn new(http_client: Arc<KustoHttpClient>) -> Self {
        Self {
            http_client,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    /// How long received messages stay hidden before the service hands them
    /// out again.
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
        idempotency: Idempotency,
    ) -> Result<reqwest::Response> {
        let mut builder = self
            .http_client
            .inner()
            .request(method, url)
            .header("x-ms-version", HeaderValue::from_static(STORAGE_API_VERSION));
        builder = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/xml"))
                .body(body),
            None => builder.body(Vec::new()),
        };
        let request = builder.build()?;
        self.http_client
            .execute_without_auth(request, idempotency)
            .await
    }

    async fn list(&self, url: Url) -> Result<Vec<QueueMessage>> {
        let response = self
            .send(Method::GET, url, None, Idempotency::Idempotent)
            .await?;
        let body = response.text().await?;
        parse_messages_list(&body)
    }
}

#[async_trait]
impl QueueService for AzureQueueService {
    async fn put_message(&self, queue: &ResourceUri, content: &str) -> Result<()> {
        let url = messages_url(queue, None)?;
        debug!("Posting message to {}", queue);
        self.send(
            Method::POST,
            url,
            Some(put_message_body(content)),
            Idempotency::NonIdempotent,
        )
        .await?;
        Ok(())
    }

    async fn peek_messages(&self, queue: &ResourceUri, count: usize) -> Result<Vec<QueueMessage>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut url = messages_url(queue, None)?;
        url.query_pairs_mut()
            .append_pair("peekonly", "true")
            .append_pair("numofmessages", &clamp_count(count));
        self.list(url).await
    }

    async fn receive_messages(
        &self,
        queue: &ResourceUri,
        count: usize,
    ) -> Result<Vec<QueueMessage>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut url = messages_url(queue, None)?;
        url.query_pairs_mut()
            .append_pair("numofmessages", &clamp_count(count))
            .append_pair(
                "visibilitytimeout",
                &self.visibility_timeout.as_secs().max(1).to_string(),
            );
        let messages = self.list(url).await?;
        debug!("Received {} messages from {}", messages.len(), queue);
        Ok(messages)
    }

    async fn delete_message(&self, queue: &ResourceUri, message: &QueueMessage) -> Result<()> {
        let mut url = messages_url(queue, Some(&message.id))?;
        url.query_pairs_mut()
            .append_pair("popreceipt", pop_receipt(message)?);
        self.send(Method::DELETE, url, None, Idempotency::Idempotent)
            .await?;
        Ok(())
    }

    async fn release_message(&self, queue: &ResourceUri, message: &QueueMessage) -> Result<()> {
        let mut url = messages_url(queue, Some(&message.id))?;
        url.query_pairs_mut()
            .append_pair("popreceipt", pop_receipt(message)?)
            .append_pair("visibilitytimeout", "0");
        self.send(Method::PUT, url, None, Idempotency::Idempotent)
            .await?;
        Ok(())
    }
}
