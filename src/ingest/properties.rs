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

//! Per-ingestion options.

use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::ingest::data_format::{DataFormat, IngestionMappingKind};

/// Which outcomes the service reports on the status queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportLevel {
    #[default]
    FailuresOnly,
    DoNotReport,
    FailuresAndSuccesses,
}

impl ReportLevel {
    pub fn as_int(&self) -> i32 {
        match self {
            Self::FailuresOnly => 0,
            Self::DoNotReport => 1,
            Self::FailuresAndSuccesses => 2,
        }
    }
}

/// Where outcomes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMethod {
    #[default]
    Queue,
    Table,
    QueueAndTable,
}

impl ReportMethod {
    pub fn as_int(&self) -> i32 {
        match self {
            Self::Queue => 0,
            Self::Table => 1,
            Self::QueueAndTable => 2,
        }
    }
}

/// One inline column mapping entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    pub column: String,
    /// Kusto type of the target column, if it should be created.
    pub datatype: Option<String>,
    /// Source-side properties, e.g. `Ordinal` or `Path`.
    pub properties: BTreeMap<String, String>,
}

impl ColumnMapping {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            datatype: None,
            properties: BTreeMap::new(),
        }
    }

    /// Map a delimited-file column by position.
    pub fn csv(column: impl Into<String>, ordinal: usize) -> Self {
        Self::new(column).with_property("Ordinal", ordinal.to_string())
    }

    /// Map a JSON document field by path, e.g. `$.a.b`.
    pub fn json(column: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(column).with_property("Path", path)
    }

    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut entry = json!({
            "column": self.column,
            "Properties": self.properties,
        });
        if let Some(ref datatype) = self.datatype {
            entry["datatype"] = Value::String(datatype.clone());
        }
        entry
    }
}

/// Options for one queued or streaming ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionProperties {
    pub database_name: String,
    pub table_name: String,
    pub data_format: DataFormat,
    /// Keep the source blob after a successful ingestion.
    pub retain_blob_on_success: Option<bool>,
    /// Skip service-side batching.
    pub flush_immediately: Option<bool>,
    pub ingestion_mapping: Option<Vec<ColumnMapping>>,
    /// Name of a mapping pre-created on the table.
    pub ingestion_mapping_reference: Option<String>,
    /// Defaults to the format's own mapping kind.
    pub ingestion_mapping_kind: Option<IngestionMappingKind>,
    pub report_level: ReportLevel,
    pub report_method: ReportMethod,
    pub additional_tags: Vec<String>,
    pub ingest_by_tags: Vec<String>,
    pub drop_by_tags: Vec<String>,
    /// Skip ingestion if an extent with one of these `ingest-by` tags exists.
    pub ingest_if_not_exists: Vec<String>,
    pub ignore_first_record: bool,
    /// Forwarded verbatim; explicit fields win on conflicts.
    pub additional_properties: BTreeMap<String, String>,
}

impl IngestionProperties {
    pub fn new(database_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: DataFormat) -> Self {
        self.data_format = format;
        self
    }

    pub fn with_report_level(mut self, level: ReportLevel) -> Self {
        self.report_level = level;
        self
    }

    pub fn with_flush_immediately(mut self, flush: bool) -> Self {
        self.flush_immediately = Some(flush);
        self
    }

    /// Mapping kind that will be sent, if any mapping is configured.
    pub fn effective_mapping_kind(&self) -> IngestionMappingKind {
        self.ingestion_mapping_kind
            .unwrap_or_else(|| self.data_format.mapping_kind())
    }

    /// Check the combination of options before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.database_name.trim().is_empty() {
            return Err(Error::invalid_argument("database_name must not be empty"));
        }
        if self.table_name.trim().is_empty() {
            return Err(Error::invalid_argument("table_name must not be empty"));
        }
        if self.ingestion_mapping.is_some() && self.ingestion_mapping_reference.is_some() {
            return Err(Error::invalid_argument(
                "ingestion_mapping and ingestion_mapping_reference are mutually exclusive",
            ));
        }
        if let Some(kind) = self.ingestion_mapping_kind {
            if kind != self.data_format.mapping_kind() {
                return Err(Error::invalid_argument(format!(
                    "Mapping kind {} does not match data format {}",
                    kind.as_str(),
                    self.data_format
                )));
            }
        }
        let has_mapping =
            self.ingestion_mapping.is_some() || self.ingestion_mapping_reference.is_some();
        if self.data_format.requires_mapping() && !has_mapping {
            return Err(Error::invalid_argument(format!(
                "Data format {} requires an ingestion mapping or mapping reference",
                self.data_format
            )));
        }
        Ok(())
    }

    /// The `AdditionalProperties` bag of a queued ingestion message.
    pub fn to_additional_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.additional_properties.clone();
        props.insert("format".into(), self.data_format.as_str().into());

        if let Some(ref mapping) = self.ingestion_mapping {
            let entries: Vec<Value> = mapping.iter().map(ColumnMapping::to_json).collect();
            props.insert("ingestionMapping".into(), Value::Array(entries).to_string());
        }
        if let Some(ref reference) = self.ingestion_mapping_reference {
            props.insert("ingestionMappingReference".into(), reference.clone());
        }
        if self.ingestion_mapping.is_some() || self.ingestion_mapping_reference.is_some() {
            props.insert(
                "ingestionMappingType".into(),
                self.effective_mapping_kind().as_str().into(),
            );
        }

        let tags: Vec<String> = self
            .additional_tags
            .iter()
            .cloned()
            .chain(self.ingest_by_tags.iter().map(|t| format!("ingest-by:{}", t)))
            .chain(self.drop_by_tags.iter().map(|t| format!("drop-by:{}", t)))
            .collect();
        if !tags.is_empty() {
            props.insert("tags".into(), Value::from(tags).to_string());
        }
        if !self.ingest_if_not_exists.is_empty() {
            props.insert(
                "ingestIfNotExists".into(),
                Value::from(self.ingest_if_not_exists.clone()).to_string(),
            );
        }
        if self.ignore_first_record {
            props.insert("ignoreFirstRecord".into(), "true".into());
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(IngestionProperties::new("db", "table").validate().is_ok());
        assert!(IngestionProperties::new("", "table").validate().is_err());

        let mut both = IngestionProperties::new("db", "table");
        both.ingestion_mapping = Some(vec![ColumnMapping::csv("a", 0)]);
        both.ingestion_mapping_reference = Some("map".into());
        assert!(both.validate().is_err());

        let mut mismatched = IngestionProperties::new("db", "table");
        mismatched.ingestion_mapping_kind = Some(IngestionMappingKind::Json);
        assert!(mismatched.validate().is_err());

        let json = IngestionProperties::new("db", "table").with_format(DataFormat::Json);
        assert!(json.validate().is_err());
    }

    #[test]
    fn test_additional_properties() {
        let mut props = IngestionProperties::new("db", "table").with_format(DataFormat::Json);
        props.ingestion_mapping = Some(vec![ColumnMapping::json("xtext", "$.xtext")]);
        props.additional_tags = vec!["a".into()];
        props.drop_by_tags = vec!["old".into()];
        props.ingest_if_not_exists = vec!["batch-1".into()];

        let bag = props.to_additional_properties();
        assert_eq!(bag["format"], "json");
        assert_eq!(bag["ingestionMappingType"], "Json");
        assert_eq!(bag["tags"], r#"["a","drop-by:old"]"#);
        assert_eq!(bag["ingestIfNotExists"], r#"["batch-1"]"#);

        let mapping: Value = serde_json::from_str(&bag["ingestionMapping"]).unwrap();
        assert_eq!(mapping[0]["column"], "xtext");
        assert_eq!(mapping[0]["Properties"]["Path"], "$.xtext");
    }

    #[test]
    fn test_report_enums() {
        assert_eq!(ReportLevel::FailuresAndSuccesses.as_int(), 2);
        assert_eq!(ReportLevel::default(), ReportLevel::FailuresOnly);
        assert_eq!(ReportMethod::default().as_int(), 0);
    }
}
