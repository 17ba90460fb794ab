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

//! Queued and streaming ingestion.

pub mod data_format;
pub mod descriptors;
pub mod message;
pub mod properties;
pub mod queue;
pub mod queued;
pub mod resources;
pub mod status;
pub mod storage;
pub mod streaming;

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;

pub use data_format::{DataFormat, IngestionMappingKind};
pub use descriptors::{BlobAuth, BlobDescriptor, FileDescriptor, StreamDescriptor};
pub use message::IngestionBlobInfo;
pub use properties::{ColumnMapping, IngestionProperties, ReportLevel, ReportMethod};
pub use queue::AzureQueueService;
pub use queued::{IngestionResult, IngestionStatus, QueuedIngestClient};
pub use resources::{IngestClientResources, ResourceManager, ResourceUri};
pub use status::{
    FailureMessage, IngestionStatusMessage, KustoIngestStatusQueues, StatusBackoff, StatusBatch,
    StatusKind, StatusQueue, SuccessMessage,
};
pub use storage::{BlobStore, HttpBlobStore, InMemoryQueueService, QueueMessage, QueueService};
pub use streaming::{StreamingIngestClient, MAX_STREAMING_SIZE_BYTES};

pub(crate) fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
