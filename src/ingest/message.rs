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

//! The message queued for the service to pick up an ingestion.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingest::descriptors::BlobDescriptor;
use crate::ingest::properties::IngestionProperties;

/// Body of a queued-ingestion request, serialized with PascalCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngestionBlobInfo {
    pub blob_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data_size: Option<u64>,
    pub database_name: String,
    pub table_name: String,
    pub retain_blob_on_success: bool,
    pub flush_immediately: bool,
    pub ignore_size_limit: bool,
    pub report_level: i32,
    pub report_method: i32,
    #[serde(with = "timestamp")]
    pub source_message_creation_time: DateTime<Utc>,
    pub id: Uuid,
    pub additional_properties: BTreeMap<String, String>,
}

impl IngestionBlobInfo {
    pub fn new(blob: &BlobDescriptor, properties: &IngestionProperties) -> Self {
        let additional_properties = properties.to_additional_properties();

        Self {
            blob_path: blob.uri(),
            raw_data_size: blob.size,
            database_name: properties.database_name.clone(),
            table_name: properties.table_name.clone(),
            retain_blob_on_success: properties.retain_blob_on_success.unwrap_or(true),
            flush_immediately: properties.flush_immediately.unwrap_or(false),
            ignore_size_limit: false,
            report_level: properties.report_level.as_int(),
            report_method: properties.report_method.as_int(),
            source_message_creation_time: Utc::now(),
            id: blob.source_id,
            additional_properties,
        }
    }

    /// Attach the identity token the service uses to authorize the blob read.
    pub fn with_authorization_context(mut self, token: impl Into<String>) -> Self {
        self.additional_properties
            .insert("authorizationContext".into(), token.into());
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::parse(format!("Failed to serialize ingestion message: {}", e)))
    }

    /// Base64 of the JSON body, as placed on the ingestion queue.
    pub fn to_queue_message(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_json()?))
    }

    /// Inverse of [`to_queue_message`](Self::to_queue_message).
    pub fn from_queue_message(text: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| Error::parse(format!("Invalid base64 ingestion message: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::parse(format!("Invalid ingestion message: {}", e)))
    }
}

/// Timestamps in the .NET round-trip form with seven fractional digits.
mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let text = value.to_rfc3339_opts(SecondsFormat::Micros, true);
        // Pad microseconds to 100ns ticks.
        let text = text.replacen('Z', "0Z", 1);
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::data_format::DataFormat;
    use crate::ingest::properties::ReportLevel;
    use serde_json::Value;

    fn sample() -> IngestionBlobInfo {
        let blob = BlobDescriptor::new(
            "https://storage.blob.core.windows.net/tmp/file.csv.gz?sas",
            Some(100),
            None,
        );
        let props = IngestionProperties::new("db", "table")
            .with_format(DataFormat::Csv)
            .with_report_level(ReportLevel::FailuresAndSuccesses)
            .with_flush_immediately(true);
        IngestionBlobInfo::new(&blob, &props)
    }

    #[test]
    fn test_message_shape() {
        let info = sample();
        let json: Value = serde_json::from_str(&info.to_json().unwrap()).unwrap();
        assert_eq!(
            json["BlobPath"],
            "https://storage.blob.core.windows.net/tmp/file.csv.gz?sas"
        );
        assert_eq!(json["RawDataSize"], 100);
        assert_eq!(json["DatabaseName"], "db");
        assert_eq!(json["TableName"], "table");
        assert_eq!(json["RetainBlobOnSuccess"], true);
        assert_eq!(json["FlushImmediately"], true);
        assert_eq!(json["IgnoreSizeLimit"], false);
        assert_eq!(json["ReportLevel"], 2);
        assert_eq!(json["ReportMethod"], 0);
        assert_eq!(json["Id"], info.id.to_string());
        assert_eq!(json["AdditionalProperties"]["format"], "csv");

        let created = json["SourceMessageCreationTime"].as_str().unwrap();
        assert!(created.ends_with('Z'));
        assert_eq!(created.split('.').nth(1).unwrap().len(), 8);
    }

    #[test]
    fn test_queue_message_round_trip() {
        let info = sample().with_authorization_context("token");
        let encoded = info.to_queue_message().unwrap();
        let decoded = IngestionBlobInfo::from_queue_message(&encoded).unwrap();
        assert_eq!(decoded.additional_properties["authorizationContext"], "token");
        assert_eq!(decoded.id, info.id);
        assert!(IngestionBlobInfo::from_queue_message("%%%").is_err());
    }
}
