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

//! Ingestion status queues.
//!
//! When an ingestion asks for queue reporting, the service posts one
//! terminal outcome per operation to either the success or the failure
//! queue. Each logical queue may be backed by several storage queues;
//! reads are spread across all of them.
//!
//! Messages are deleted only after they decoded into an
//! [`IngestionStatusMessage`]. Anything else is released back to the queue
//! and logged, so no outcome is lost to a decoding problem.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ingest::resources::{IngestClientResources, ResourceUri};
use crate::ingest::storage::{QueueMessage, QueueService};

/// A successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SuccessMessage {
    pub operation_id: String,
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub succeeded_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ingestion_source_id: Option<String>,
    #[serde(default)]
    pub ingestion_source_path: Option<String>,
    #[serde(default)]
    pub root_activity_id: Option<String>,
}

/// A failed ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailureMessage {
    pub operation_id: String,
    pub database: String,
    pub table: String,
    #[serde(default)]
    pub failed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ingestion_source_id: Option<String>,
    #[serde(default)]
    pub ingestion_source_path: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    /// "Permanent", "Transient" or "Exhausted".
    #[serde(default)]
    pub failure_status: Option<String>,
    #[serde(default)]
    pub root_activity_id: Option<String>,
    #[serde(default)]
    pub originates_from_update_policy: bool,
    #[serde(default)]
    pub should_retry: bool,
}

/// One terminal ingestion outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionStatusMessage {
    Success(SuccessMessage),
    Failure(FailureMessage),
}

impl IngestionStatusMessage {
    pub fn operation_id(&self) -> &str {
        match self {
            Self::Success(m) => &m.operation_id,
            Self::Failure(m) => &m.operation_id,
        }
    }

    pub fn database(&self) -> &str {
        match self {
            Self::Success(m) => &m.database,
            Self::Failure(m) => &m.database,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::Success(m) => &m.table,
            Self::Failure(m) => &m.table,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Success(m) => m.succeeded_on,
            Self::Failure(m) => m.failed_on,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Which outcome a queue carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Failure,
}

/// Decode a queue message body: base64 of the status JSON.
pub fn decode_status_message(kind: StatusKind, content: &str) -> Result<IngestionStatusMessage> {
    let bytes = STANDARD
        .decode(content.trim())
        .map_err(|e| Error::parse(format!("Status message is not base64: {}", e)))?;
    let message = match kind {
        StatusKind::Success => serde_json::from_slice(&bytes).map(IngestionStatusMessage::Success),
        StatusKind::Failure => serde_json::from_slice(&bytes).map(IngestionStatusMessage::Failure),
    };
    message.map_err(|e| Error::parse(format!("Invalid status message: {}", e)))
}

/// One logical status queue over one or more storage queues.
#[derive(Debug, Clone)]
pub struct StatusQueue {
    kind: StatusKind,
    queues: Vec<ResourceUri>,
    service: Arc<dyn QueueService>,
}

impl StatusQueue {
    pub fn new(kind: StatusKind, queues: Vec<ResourceUri>, service: Arc<dyn QueueService>) -> Self {
        Self {
            kind,
            queues,
            service,
        }
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn queues(&self) -> &[ResourceUri] {
        &self.queues
    }

    /// True when no underlying queue has a visible message. Best effort:
    /// the service may post a message right after.
    pub async fn is_empty(&self) -> Result<bool> {
        for queue in &self.queues {
            if !self.service.peek_messages(queue, 1).await?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Look at up to `n` messages without consuming them.
    pub async fn peek(&self, n: usize) -> Result<Vec<IngestionStatusMessage>> {
        let mut messages = Vec::new();
        for (queue, raw) in self.collect(n, Fetch::Peek).await? {
            match decode_status_message(self.kind, &raw.content) {
                Ok(message) => messages.push(message),
                Err(e) => warn!("Skipping undecodable message {} on {}: {}", raw.id, queue, e),
            }
        }
        Ok(messages)
    }

    /// Consume up to `n` messages.
    ///
    /// Each returned message has been deleted from its storage queue.
    /// Messages that fail to decode are released and not returned. If a
    /// delete fails, the messages not yet deleted are released and the ones
    /// already deleted are returned; the error surfaces only when nothing
    /// was delivered.
    pub async fn pop(&self, n: usize) -> Result<Vec<IngestionStatusMessage>> {
        let mut messages = Vec::new();
        let mut pending = self.collect(n, Fetch::Receive).await?.into_iter();
        while let Some((queue, raw)) = pending.next() {
            match decode_status_message(self.kind, &raw.content) {
                Ok(message) => {
                    if let Err(e) = self.service.delete_message(queue, &raw).await {
                        warn!("Failed to delete status message {} on {}: {}", raw.id, queue, e);
                        self.release_all(std::iter::once((queue, raw)).chain(pending.by_ref()))
                            .await;
                        if messages.is_empty() {
                            return Err(e);
                        }
                        break;
                    }
                    messages.push(message);
                }
                Err(e) => {
                    warn!(
                        "Releasing undecodable message {} on {}: {}",
                        raw.id, queue, e
                    );
                    self.release_all(std::iter::once((queue, raw))).await;
                }
            }
        }
        debug!("Popped {} {:?} status message(s)", messages.len(), self.kind);
        Ok(messages)
    }

    async fn release_all<'a>(
        &self,
        messages: impl Iterator<Item = (&'a ResourceUri, QueueMessage)>,
    ) {
        for (queue, raw) in messages {
            if let Err(e) = self.service.release_message(queue, &raw).await {
                // Becomes visible again once its visibility timeout expires.
                warn!("Failed to release status message {} on {}: {}", raw.id, queue, e);
            }
        }
    }

    /// Fetch up to `n` raw messages spread across the queues, topping up
    /// from queues that still had more once the even share is taken.
    ///
    /// A failed receive after some messages were received ends collection
    /// early so the caller still handles what it holds.
    async fn collect(&self, n: usize, fetch: Fetch) -> Result<Vec<(&ResourceUri, QueueMessage)>> {
        let mut collected = Vec::new();
        if n == 0 || self.queues.is_empty() {
            return Ok(collected);
        }

        let shares = split_evenly(n, self.queues.len());
        let mut may_have_more = Vec::new();
        for (queue, share) in self.queues.iter().zip(shares) {
            if share == 0 {
                may_have_more.push(queue);
                continue;
            }
            let batch = match self.fetch(queue, share, fetch).await {
                Ok(batch) => batch,
                Err(e) => return interrupted(collected, e, fetch),
            };
            if batch.len() == share {
                may_have_more.push(queue);
            }
            collected.extend(batch.into_iter().map(|m| (queue, m)));
        }

        for queue in may_have_more {
            let remaining = n - collected.len();
            if remaining == 0 {
                break;
            }
            let already: Vec<String> = collected
                .iter()
                .filter(|(q, _)| *q == queue)
                .map(|(_, m)| m.id.clone())
                .collect();
            let batch: Vec<QueueMessage> = match fetch {
                // Peeking is not destructive; skip what the first pass saw.
                Fetch::Peek => self
                    .fetch(queue, already.len() + remaining, fetch)
                    .await?
                    .into_iter()
                    .filter(|m| !already.contains(&m.id))
                    .take(remaining)
                    .collect(),
                Fetch::Receive => match self.fetch(queue, remaining, fetch).await {
                    Ok(batch) => batch,
                    Err(e) => return interrupted(collected, e, fetch),
                },
            };
            collected.extend(batch.into_iter().map(|m| (queue, m)));
        }
        Ok(collected)
    }

    async fn fetch(
        &self,
        queue: &ResourceUri,
        count: usize,
        fetch: Fetch,
    ) -> Result<Vec<QueueMessage>> {
        match fetch {
            Fetch::Peek => self.service.peek_messages(queue, count).await,
            Fetch::Receive => self.service.receive_messages(queue, count).await,
        }
    }
}

/// Keeps what was already received when a later receive fails.
fn interrupted<'a>(
    collected: Vec<(&'a ResourceUri, QueueMessage)>,
    error: Error,
    fetch: Fetch,
) -> Result<Vec<(&'a ResourceUri, QueueMessage)>> {
    match fetch {
        Fetch::Receive if !collected.is_empty() => {
            warn!(
                "Receive failed after {} status message(s): {}",
                collected.len(),
                error
            );
            Ok(collected)
        }
        _ => Err(error),
    }
}

#[derive(Debug, Clone, Copy)]
enum Fetch {
    Peek,
    Receive,
}

/// Split `n` into `k` shares differing by at most one.
fn split_evenly(n: usize, k: usize) -> Vec<usize> {
    (0..k).map(|i| n / k + usize::from(i < n % k)).collect()
}

/// The success and failure queues of one ingestion endpoint.
#[derive(Debug, Clone)]
pub struct KustoIngestStatusQueues {
    pub success: StatusQueue,
    pub failure: StatusQueue,
}

/// Messages returned by one poll of both queues.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBatch {
    pub successes: Vec<SuccessMessage>,
    pub failures: Vec<FailureMessage>,
}

impl StatusBatch {
    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

impl KustoIngestStatusQueues {
    pub fn new(resources: &IngestClientResources, service: Arc<dyn QueueService>) -> Self {
        Self {
            success: StatusQueue::new(
                StatusKind::Success,
                resources.successful_ingestions_queues.clone(),
                service.clone(),
            ),
            failure: StatusQueue::new(
                StatusKind::Failure,
                resources.failed_ingestions_queues.clone(),
                service,
            ),
        }
    }

    /// Pop up to `n` messages from each queue.
    ///
    /// A failure on one queue does not discard what the other delivered;
    /// the error is returned only when the batch would be empty.
    pub async fn pop_both(&self, n: usize) -> Result<StatusBatch> {
        let mut batch = StatusBatch::default();
        let mut errors = Vec::new();
        match self.success.pop(n).await {
            Ok(messages) => {
                for message in messages {
                    if let IngestionStatusMessage::Success(m) = message {
                        batch.successes.push(m);
                    }
                }
            }
            Err(e) => errors.push(e),
        }
        match self.failure.pop(n).await {
            Ok(messages) => {
                for message in messages {
                    if let IngestionStatusMessage::Failure(m) = message {
                        batch.failures.push(m);
                    }
                }
            }
            Err(e) => errors.push(e),
        }

        let mut errors = errors.into_iter();
        match errors.next() {
            None => Ok(batch),
            Some(e) if batch.is_empty() => Err(e),
            Some(e) => {
                warn!("Returning {} status message(s) after error: {}", batch.len(), e);
                for e in errors {
                    warn!("Status queue error: {}", e);
                }
                Ok(batch)
            }
        }
    }

    /// Poll both queues until at least one message arrives, sleeping
    /// between empty polls as `backoff` dictates.
    pub async fn wait_for_messages(
        &self,
        n: usize,
        backoff: &mut StatusBackoff,
    ) -> Result<StatusBatch> {
        loop {
            let batch = self.pop_both(n).await?;
            match backoff.on_poll(batch.len()) {
                None => return Ok(batch),
                Some(delay) => {
                    debug!("Status queues empty, waiting {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Delay schedule for polling the status queues.
///
/// Starts at one second and doubles after every empty poll, up to a cap.
/// Any non-empty poll resets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Default for StatusBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(180))
    }
}

impl StatusBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the next call returns double, capped.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Record a poll that returned `received` messages. Returns the delay
    /// to wait if the poll was empty.
    pub fn on_poll(&mut self, received: usize) -> Option<Duration> {
        if received > 0 {
            self.reset();
            None
        } else {
            Some(self.next_delay())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::storage::InMemoryQueueService;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the delete with the given 1-based index and every receive
    /// after `receives_before_failure`.
    #[derive(Debug)]
    struct FlakyQueueService {
        inner: Arc<InMemoryQueueService>,
        failing_delete: usize,
        receives_before_failure: usize,
        deletes: AtomicUsize,
        receives: AtomicUsize,
    }

    impl FlakyQueueService {
        fn new(inner: Arc<InMemoryQueueService>) -> Self {
            Self {
                inner,
                failing_delete: usize::MAX,
                receives_before_failure: usize::MAX,
                deletes: AtomicUsize::new(0),
                receives: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QueueService for FlakyQueueService {
        async fn put_message(&self, queue: &ResourceUri, content: &str) -> Result<()> {
            self.inner.put_message(queue, content).await
        }

        async fn peek_messages(
            &self,
            queue: &ResourceUri,
            count: usize,
        ) -> Result<Vec<QueueMessage>> {
            self.inner.peek_messages(queue, count).await
        }

        async fn receive_messages(
            &self,
            queue: &ResourceUri,
            count: usize,
        ) -> Result<Vec<QueueMessage>> {
            if self.receives.fetch_add(1, Ordering::SeqCst) >= self.receives_before_failure {
                return Err(Error::Http {
                    status: 500,
                    body: "receive failed".to_string(),
                });
            }
            self.inner.receive_messages(queue, count).await
        }

        async fn delete_message(&self, queue: &ResourceUri, message: &QueueMessage) -> Result<()> {
            if self.deletes.fetch_add(1, Ordering::SeqCst) + 1 == self.failing_delete {
                return Err(Error::Http {
                    status: 503,
                    body: "delete failed".to_string(),
                });
            }
            self.inner.delete_message(queue, message).await
        }

        async fn release_message(&self, queue: &ResourceUri, message: &QueueMessage) -> Result<()> {
            self.inner.release_message(queue, message).await
        }
    }

    fn encode(value: serde_json::Value) -> String {
        STANDARD.encode(value.to_string())
    }

    fn success(id: &str) -> String {
        encode(json!({
            "OperationId": id,
            "Database": "db",
            "Table": "table",
            "SucceededOn": "2024-01-01T10:00:00.1234567Z",
            "IngestionSourcePath": "https://acc.blob.core.windows.net/c/b.csv.gz"
        }))
    }

    #[test]
    fn test_backoff_sequence() {
        let mut backoff = StatusBackoff::default();
        let delays: Vec<u64> = (0..10).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 64, 128, 180, 180]);

        assert_eq!(backoff.on_poll(3), None);
        assert_eq!(backoff.on_poll(0), Some(Duration::from_secs(1)));
        assert_eq!(backoff.on_poll(0), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_split_evenly() {
        assert_eq!(split_evenly(10, 3), vec![4, 3, 3]);
        assert_eq!(split_evenly(1, 3), vec![1, 0, 0]);
    }

    #[test]
    fn test_decode_failure_message() {
        let content = encode(json!({
            "OperationId": "op",
            "Database": "db",
            "Table": "table",
            "FailedOn": "2024-01-01T10:00:00Z",
            "Details": "Stream with id 'x' has a malformed Csv format",
            "ErrorCode": "BadRequest_InvalidCsvFormat",
            "FailureStatus": "Permanent",
            "OriginatesFromUpdatePolicy": false,
            "ShouldRetry": false
        }));
        match decode_status_message(StatusKind::Failure, &content).unwrap() {
            IngestionStatusMessage::Failure(m) => {
                assert_eq!(m.error_code.as_deref(), Some("BadRequest_InvalidCsvFormat"));
                assert!(!m.should_retry);
                assert!(m.failed_on.is_some());
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert!(decode_status_message(StatusKind::Success, "not base64!").is_err());
    }

    #[tokio::test]
    async fn test_pop_spreads_across_queues() {
        let service = Arc::new(InMemoryQueueService::new());
        let q1 = ResourceUri::parse("https://acc.queue.core.windows.net/s1?sas").unwrap();
        let q2 = ResourceUri::parse("https://acc.queue.core.windows.net/s2?sas").unwrap();
        for i in 0..4 {
            service.put_message(&q1, &success(&format!("a{}", i))).await.unwrap();
        }
        service.put_message(&q2, &success("b0")).await.unwrap();

        let queue = StatusQueue::new(
            StatusKind::Success,
            vec![q1.clone(), q2.clone()],
            service.clone(),
        );
        assert_eq!(queue.peek(10).await.unwrap().len(), 5);

        let popped = queue.pop(4).await.unwrap();
        assert_eq!(popped.len(), 4);
        assert!(popped.iter().any(|m| m.operation_id() == "b0"));

        let rest = queue.pop(4).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert!(queue.is_empty().await.unwrap());
        assert_eq!(service.in_flight_count(&q1).await, 0);
    }

    #[tokio::test]
    async fn test_undecodable_message_is_released() {
        let service = Arc::new(InMemoryQueueService::new());
        let q = ResourceUri::parse("https://acc.queue.core.windows.net/f?sas").unwrap();
        service.put_message(&q, "garbage").await.unwrap();

        let queue = StatusQueue::new(StatusKind::Failure, vec![q.clone()], service.clone());
        assert!(queue.pop(10).await.unwrap().is_empty());
        assert_eq!(service.visible_count(&q).await, 1);
        assert!(!queue.is_empty().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_messages_backs_off() {
        let service = Arc::new(InMemoryQueueService::new());
        let resources = IngestClientResources {
            successful_ingestions_queues: vec![
                ResourceUri::parse("https://acc.queue.core.windows.net/ok?sas").unwrap(),
            ],
            failed_ingestions_queues: vec![
                ResourceUri::parse("https://acc.queue.core.windows.net/failed?sas").unwrap(),
            ],
            ..Default::default()
        };
        let queues = KustoIngestStatusQueues::new(&resources, service.clone());

        let producer = {
            let service = service.clone();
            let queue = resources.successful_ingestions_queues[0].clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                service.put_message(&queue, &success("late")).await.unwrap();
            })
        };

        let start = tokio::time::Instant::now();
        let mut backoff = StatusBackoff::default();
        let batch = queues.wait_for_messages(10, &mut backoff).await.unwrap();
        producer.await.unwrap();

        assert_eq!(batch.successes.len(), 1);
        assert_eq!(batch.successes[0].operation_id, "late");
        // Polls at t=0, 1, 3 and 7 seconds.
        assert_eq!(start.elapsed(), Duration::from_secs(7));
        assert_eq!(backoff, StatusBackoff::default());
    }

    #[tokio::test]
    async fn test_failed_delete_loses_no_message() {
        let inner = Arc::new(InMemoryQueueService::new());
        let q = ResourceUri::parse("https://acc.queue.core.windows.net/s?sas").unwrap();
        for id in ["op-1", "op-2", "op-3"] {
            inner.put_message(&q, &success(id)).await.unwrap();
        }
        let service = FlakyQueueService {
            failing_delete: 2,
            ..FlakyQueueService::new(inner.clone())
        };
        let queue = StatusQueue::new(StatusKind::Success, vec![q.clone()], Arc::new(service));

        let delivered = queue.pop(10).await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].operation_id(), "op-1");
        assert_eq!(inner.in_flight_count(&q).await, 0);

        inner.expire_visibility().await;
        let mut recovered: Vec<String> = inner
            .receive_messages(&q, 10)
            .await
            .unwrap()
            .iter()
            .map(|m| {
                decode_status_message(StatusKind::Success, &m.content)
                    .unwrap()
                    .operation_id()
                    .to_string()
            })
            .collect();
        recovered.sort();
        assert_eq!(recovered, vec!["op-2", "op-3"]);
    }

    #[tokio::test]
    async fn test_failed_first_delete_is_an_error() {
        let inner = Arc::new(InMemoryQueueService::new());
        let q = ResourceUri::parse("https://acc.queue.core.windows.net/s?sas").unwrap();
        inner.put_message(&q, &success("op-1")).await.unwrap();
        let service = FlakyQueueService {
            failing_delete: 1,
            ..FlakyQueueService::new(inner.clone())
        };
        let queue = StatusQueue::new(StatusKind::Success, vec![q.clone()], Arc::new(service));

        assert!(queue.pop(10).await.is_err());
        assert_eq!(inner.visible_count(&q).await, 1);
    }

    #[tokio::test]
    async fn test_failed_receive_keeps_earlier_queues() {
        let inner = Arc::new(InMemoryQueueService::new());
        let q1 = ResourceUri::parse("https://acc.queue.core.windows.net/s1?sas").unwrap();
        let q2 = ResourceUri::parse("https://acc.queue.core.windows.net/s2?sas").unwrap();
        inner.put_message(&q1, &success("a")).await.unwrap();
        inner.put_message(&q2, &success("b")).await.unwrap();
        let service = FlakyQueueService {
            receives_before_failure: 1,
            ..FlakyQueueService::new(inner.clone())
        };
        let queue = StatusQueue::new(
            StatusKind::Success,
            vec![q1.clone(), q2.clone()],
            Arc::new(service),
        );

        let delivered = queue.pop(2).await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].operation_id(), "a");
        assert_eq!(inner.visible_count(&q2).await, 1);
    }

    #[tokio::test]
    async fn test_pop_both_keeps_successes_when_failure_queue_errors() {
        let inner = Arc::new(InMemoryQueueService::new());
        let resources = IngestClientResources {
            successful_ingestions_queues: vec![
                ResourceUri::parse("https://acc.queue.core.windows.net/ok?sas").unwrap(),
            ],
            failed_ingestions_queues: vec![
                ResourceUri::parse("https://acc.queue.core.windows.net/failed?sas").unwrap(),
            ],
            ..Default::default()
        };
        let ok = &resources.successful_ingestions_queues[0];
        inner.put_message(ok, &success("op-1")).await.unwrap();
        inner.put_message(ok, &success("op-2")).await.unwrap();
        let service = FlakyQueueService {
            receives_before_failure: 1,
            ..FlakyQueueService::new(inner.clone())
        };
        let queues = KustoIngestStatusQueues::new(&resources, Arc::new(service));

        let batch = queues.pop_both(10).await.unwrap();
        assert_eq!(batch.successes.len(), 2);
        assert!(batch.failures.is_empty());
        assert_eq!(inner.visible_count(ok).await, 0);
        assert_eq!(inner.in_flight_count(ok).await, 0);
    }
}
