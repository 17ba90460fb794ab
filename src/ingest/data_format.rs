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

//! Source data formats accepted by ingestion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Kind of column mapping a format uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngestionMappingKind {
    Csv,
    Json,
    Avro,
    ApacheAvro,
    Parquet,
    Orc,
    W3CLogFile,
}

impl IngestionMappingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "Csv",
            Self::Json => "Json",
            Self::Avro => "Avro",
            Self::ApacheAvro => "ApacheAvro",
            Self::Parquet => "Parquet",
            Self::Orc => "Orc",
            Self::W3CLogFile => "W3CLogFile",
        }
    }
}

/// Format of the data being ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Csv,
    Tsv,
    Scsv,
    Sohsv,
    Psv,
    Txt,
    Raw,
    Tsve,
    Json,
    SingleJson,
    MultiJson,
    Avro,
    ApacheAvro,
    Parquet,
    Orc,
    W3CLogFile,
}

impl DataFormat {
    /// Every supported format.
    pub const ALL: [DataFormat; 16] = [
        Self::Csv,
        Self::Tsv,
        Self::Scsv,
        Self::Sohsv,
        Self::Psv,
        Self::Txt,
        Self::Raw,
        Self::Tsve,
        Self::Json,
        Self::SingleJson,
        Self::MultiJson,
        Self::Avro,
        Self::ApacheAvro,
        Self::Parquet,
        Self::Orc,
        Self::W3CLogFile,
    ];

    /// Name used on the wire and as a file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Scsv => "scsv",
            Self::Sohsv => "sohsv",
            Self::Psv => "psv",
            Self::Txt => "txt",
            Self::Raw => "raw",
            Self::Tsve => "tsve",
            Self::Json => "json",
            Self::SingleJson => "singlejson",
            Self::MultiJson => "multijson",
            Self::Avro => "avro",
            Self::ApacheAvro => "apacheavro",
            Self::Parquet => "parquet",
            Self::Orc => "orc",
            Self::W3CLogFile => "w3clogfile",
        }
    }

    /// Binary formats carry their own compression and are never gzipped.
    pub fn is_compressible(&self) -> bool {
        !matches!(
            self,
            Self::Avro | Self::ApacheAvro | Self::Parquet | Self::Orc
        )
    }

    pub fn mapping_kind(&self) -> IngestionMappingKind {
        match self {
            Self::Json | Self::SingleJson | Self::MultiJson => IngestionMappingKind::Json,
            Self::Avro => IngestionMappingKind::Avro,
            Self::ApacheAvro => IngestionMappingKind::ApacheAvro,
            Self::Parquet => IngestionMappingKind::Parquet,
            Self::Orc => IngestionMappingKind::Orc,
            Self::W3CLogFile => IngestionMappingKind::W3CLogFile,
            _ => IngestionMappingKind::Csv,
        }
    }

    /// Whether ingesting this format requires a column mapping.
    pub fn requires_mapping(&self) -> bool {
        matches!(
            self,
            Self::Json | Self::SingleJson | Self::MultiJson | Self::Avro
        )
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == lower)
            .ok_or_else(|| Error::invalid_argument(format!("Unknown data format: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("CSV".parse::<DataFormat>().unwrap(), DataFormat::Csv);
        assert_eq!(
            "multijson".parse::<DataFormat>().unwrap(),
            DataFormat::MultiJson
        );
        assert!("xlsx".parse::<DataFormat>().is_err());
        for format in DataFormat::ALL {
            assert_eq!(format.as_str().parse::<DataFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_format_traits() {
        assert!(DataFormat::Csv.is_compressible());
        assert!(!DataFormat::Parquet.is_compressible());
        assert_eq!(DataFormat::Tsv.mapping_kind(), IngestionMappingKind::Csv);
        assert_eq!(DataFormat::SingleJson.mapping_kind(), IngestionMappingKind::Json);
        assert!(DataFormat::Json.requires_mapping());
        assert!(!DataFormat::Csv.requires_mapping());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&DataFormat::W3CLogFile).unwrap(),
            "\"w3clogfile\""
        );
        assert_eq!(
            serde_json::to_string(&DataFormat::SingleJson).unwrap(),
            "\"singlejson\""
        );
    }
}
