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

//! Descriptions of the data handed to an ingest client.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use uuid::Uuid;

use crate::error::Result;
use crate::ingest::data_format::DataFormat;

/// Estimated expansion of zip archives relative to their size on disk.
const ZIP_EXPANSION_FACTOR: u64 = 11;

/// How the service authenticates to a source blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobAuth {
    /// SAS token appended as the URL query.
    SasToken(String),
    /// Object id of a user-assigned managed identity.
    UserAssignedManagedIdentity(String),
    SystemAssignedManagedIdentity,
}

/// A blob already in storage.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobDescriptor {
    uri: String,
    /// Uncompressed size in bytes, if known.
    pub size: Option<u64>,
    pub source_id: Uuid,
    blob_auth: Option<BlobAuth>,
}

impl BlobDescriptor {
    pub fn new(uri: impl Into<String>, size: Option<u64>, source_id: Option<Uuid>) -> Self {
        Self {
            uri: uri.into(),
            size,
            source_id: source_id.unwrap_or_else(Uuid::new_v4),
            blob_auth: None,
        }
    }

    pub fn with_blob_auth(mut self, auth: BlobAuth) -> Self {
        self.blob_auth = Some(auth);
        self
    }

    /// URI as sent to the service, with the authentication suffix applied.
    pub fn uri(&self) -> String {
        match &self.blob_auth {
            Some(BlobAuth::SasToken(token)) => {
                format!("{}?{}", self.uri, token.trim_start_matches('?'))
            }
            Some(BlobAuth::UserAssignedManagedIdentity(object_id)) => {
                format!("{};managed_identity={}", self.uri, object_id)
            }
            Some(BlobAuth::SystemAssignedManagedIdentity) => {
                format!("{};managed_identity=system", self.uri)
            }
            None => self.uri.clone(),
        }
    }
}

/// A local file to upload and ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    /// Uncompressed size in bytes; estimated from the file when unset.
    pub size: Option<u64>,
    pub source_id: Uuid,
}

impl FileDescriptor {
    pub fn new(path: impl Into<PathBuf>, size: Option<u64>, source_id: Option<Uuid>) -> Self {
        Self {
            path: path.into(),
            size,
            source_id: source_id.unwrap_or_else(Uuid::new_v4),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string())
    }

    /// Already gzip or zip compressed.
    pub fn is_compressed(&self) -> bool {
        compression_of(&self.path).is_some()
    }

    /// Raw data size: the explicit size, or an estimate.
    ///
    /// Gzip files report the size in their trailer; zip archives are assumed
    /// to expand elevenfold; anything else is its length on disk.
    pub async fn raw_size(&self) -> Result<u64> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let mut file = tokio::fs::File::open(&self.path).await?;
        let len = file.metadata().await?.len();
        match compression_of(&self.path) {
            Some(Compression::Gzip) if len >= 4 => {
                file.seek(SeekFrom::End(-4)).await?;
                let mut trailer = [0u8; 4];
                file.read_exact(&mut trailer).await?;
                Ok(u64::from(u32::from_le_bytes(trailer)))
            }
            Some(Compression::Zip) => Ok(len * ZIP_EXPANSION_FACTOR),
            _ => Ok(len),
        }
    }

    /// Blob name used when uploading this file to temporary storage.
    pub fn blob_name(&self, database: &str, table: &str, format: DataFormat) -> String {
        let suffix = if self.is_compressed() {
            String::new()
        } else if format.is_compressible() {
            ".gz".to_string()
        } else {
            String::new()
        };
        format!(
            "{}__{}__{}__{}{}",
            database,
            table,
            self.source_id,
            self.file_name(),
            suffix
        )
    }
}

/// In-memory data to ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub data: Vec<u8>,
    /// Data is already gzip compressed.
    pub compressed: bool,
    pub source_id: Uuid,
}

impl StreamDescriptor {
    pub fn new(data: impl Into<Vec<u8>>, compressed: bool, source_id: Option<Uuid>) -> Self {
        Self {
            data: data.into(),
            compressed,
            source_id: source_id.unwrap_or_else(Uuid::new_v4),
        }
    }

    /// Raw size of uncompressed data. Unknown for compressed streams.
    pub fn raw_size(&self) -> Option<u64> {
        if self.compressed {
            None
        } else {
            Some(self.data.len() as u64)
        }
    }

    pub fn blob_name(&self, database: &str, table: &str, format: DataFormat) -> String {
        let suffix = if self.compressed { ".gz" } else { "" };
        format!(
            "{}__{}__{}__stream.{}{}",
            database, table, self.source_id, format, suffix
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    Gzip,
    Zip,
}

fn compression_of(path: &Path) -> Option<Compression> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "gz" => Some(Compression::Gzip),
        "zip" => Some(Compression::Zip),
        _ => None,
    }
}
