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

//! Management endpoint (`/v1/rest/mgmt`) response types.
//!
//! The V1 format is a single object holding a list of tables. When there is
//! more than one table, the last one is a table of contents describing the
//! others.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct V1Response {
    pub tables: Vec<V1Table>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct V1Table {
    pub table_name: String,
    pub columns: Vec<V1Column>,
    pub rows: Vec<Value>,
}

/// Column metadata. `ColumnType` is the Kusto type name; older payloads only
/// carry the CLR `DataType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct V1Column {
    pub column_name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub column_type: Option<String>,
}

/// A V1 row that carries exception text instead of cells.
#[derive(Debug, Clone, Deserialize)]
pub struct V1ExceptionRow {
    #[serde(rename = "Exceptions")]
    pub exceptions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_response_deserialization() {
        let json = r#"{"Tables": [{
            "TableName": "Table_0",
            "Columns": [
                {"ColumnName": "BuildVersion", "DataType": "String", "ColumnType": "string"},
                {"ColumnName": "BuildTime", "DataType": "DateTime"}
            ],
            "Rows": [["1.0.0", "2018-01-01T00:00:00Z"]]
        }]}"#;

        let response: V1Response = serde_json::from_str(json).unwrap();
        assert_eq!(response.tables.len(), 1);
        let table = &response.tables[0];
        assert_eq!(table.columns[0].column_type.as_deref(), Some("string"));
        assert!(table.columns[1].column_type.is_none());
        assert_eq!(table.columns[1].data_type.as_deref(), Some("DateTime"));
    }
}
