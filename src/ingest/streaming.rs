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

//! Streaming ingestion.
//!
//! Small payloads are posted straight to the engine and committed before
//! the call returns. Mappings must be pre-created on the table and passed
//! by name.

use tracing::{debug, info};

use crate::client::StreamingIngestRequest;
use crate::error::{Error, Result};
use crate::ingest::descriptors::{FileDescriptor, StreamDescriptor};
use crate::ingest::gzip;
use crate::ingest::properties::IngestionProperties;
use crate::ingest::queued::{IngestionResult, IngestionStatus};
use crate::kusto::KustoClient;

/// Largest body the streaming endpoint accepts.
pub const MAX_STREAMING_SIZE_BYTES: usize = 4 * 1024 * 1024;

/// Client for the engine's streaming-ingest endpoint.
#[derive(Debug, Clone)]
pub struct StreamingIngestClient {
    client: KustoClient,
}

impl StreamingIngestClient {
    /// `client` must point at the engine endpoint, not the ingestion one.
    pub fn new(client: KustoClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &KustoClient {
        &self.client
    }

    pub async fn ingest_from_stream(
        &self,
        stream: StreamDescriptor,
        properties: &IngestionProperties,
    ) -> Result<IngestionResult> {
        properties.validate()?;
        if properties.ingestion_mapping.is_some() {
            return Err(Error::invalid_argument(
                "Streaming ingestion takes a mapping reference, not an inline mapping",
            ));
        }
        if stream.data.is_empty() {
            return Err(Error::invalid_argument("Stream is empty"));
        }

        let (data, compressed) = if !stream.compressed && properties.data_format.is_compressible()
        {
            (gzip(&stream.data)?, true)
        } else {
            (stream.data, stream.compressed)
        };
        if data.len() > MAX_STREAMING_SIZE_BYTES {
            return Err(Error::invalid_argument(format!(
                "Payload of {} bytes exceeds the streaming limit of {} bytes",
                data.len(),
                MAX_STREAMING_SIZE_BYTES
            )));
        }

        let request = StreamingIngestRequest {
            database: properties.database_name.clone(),
            table: properties.table_name.clone(),
            format: properties.data_format,
            mapping_name: properties.ingestion_mapping_reference.clone(),
            data,
            compressed,
            client_request_id: Some(format!(
                "KRC.executeStreamingIngest;{}",
                stream.source_id
            )),
        };
        debug!(
            "Streaming {} bytes into {}.{}",
            request.data.len(),
            request.database,
            request.table
        );
        self.client.execute_streaming_ingest(&request).await?;
        info!(
            "Streamed ingestion {} into {}.{}",
            stream.source_id, properties.database_name, properties.table_name
        );

        Ok(IngestionResult {
            status: IngestionStatus::Succeeded,
            database: properties.database_name.clone(),
            table: properties.table_name.clone(),
            source_id: stream.source_id,
            blob_uri: None,
        })
    }

    pub async fn ingest_from_file(
        &self,
        file: FileDescriptor,
        properties: &IngestionProperties,
    ) -> Result<IngestionResult> {
        let data = tokio::fs::read(&file.path).await?;
        let stream = StreamDescriptor::new(data, file.is_compressed(), Some(file.source_id));
        self.ingest_from_stream(stream, properties).await
    }
}
