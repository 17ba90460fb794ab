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

//! Query endpoint (`/v2/rest/query`) frame types.
//!
//! A V2 response is a JSON array of frames, each tagged by `FrameType`.
//! These types map directly to the wire structures and carry no decoding
//! logic; the result parser turns them into typed tables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One element of a V2 response array.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "FrameType")]
pub enum Frame {
    DataSetHeader(DataSetHeader),
    DataTable(DataTable),
    TableHeader(TableHeader),
    TableFragment(TableFragment),
    TableProgress(TableProgress),
    TableCompletion(TableCompletion),
    DataSetCompletion(DataSetCompletion),
    /// A frame type this client does not know.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSetHeader {
    #[serde(default)]
    pub is_progressive: bool,
    pub version: String,
    #[serde(default)]
    pub is_fragmented: Option<bool>,
    #[serde(default)]
    pub error_reporting_placement: Option<ErrorReportingPlacement>,
}

/// Where errors are reported: within the data, at the end of the table, or
/// at the end of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorReportingPlacement {
    InData,
    EndOfTable,
    EndOfDataSet,
}

/// A complete table (non-progressive mode).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataTable {
    pub table_id: i64,
    pub table_kind: TableKind,
    pub table_name: String,
    pub columns: Vec<ColumnV2>,
    /// Each row is either an array of cells or an inline error object.
    pub rows: Vec<Value>,
}

/// Opens a table in progressive mode; rows follow in fragments.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableHeader {
    pub table_id: i64,
    pub table_kind: TableKind,
    pub table_name: String,
    pub columns: Vec<ColumnV2>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableFragment {
    pub table_id: i64,
    #[serde(default)]
    pub field_count: Option<usize>,
    pub table_fragment_type: TableFragmentType,
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableProgress {
    pub table_id: i64,
    pub table_progress: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableCompletion {
    pub table_id: i64,
    #[serde(default)]
    pub row_count: Option<i64>,
    #[serde(default)]
    pub one_api_errors: Option<Vec<OneApiError>>,
}

/// Final frame of every V2 response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSetCompletion {
    #[serde(default)]
    pub has_errors: bool,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub one_api_errors: Option<Vec<OneApiError>>,
}

/// How a progressive fragment combines with the rows received so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TableFragmentType {
    DataAppend,
    DataReplace,
}

/// Role a table plays in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    /// The caller's query output.
    PrimaryResult,
    QueryCompletionInformation,
    QueryTraceLog,
    QueryPerfLog,
    TableOfContents,
    QueryProperties,
    QueryPlan,
    /// Status table of a management (V1) response.
    QueryStatus,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnV2 {
    pub column_name: String,
    pub column_type: String,
}

/// Error payload used both inline in rows and as an HTTP error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneApiError {
    pub error: OneApiErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(rename = "@message", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "@permanent", default)]
    pub permanent: bool,
}

/// A row that carries errors instead of cells.
#[derive(Debug, Clone, Deserialize)]
pub struct InlineErrorRow {
    #[serde(rename = "OneApiErrors")]
    pub one_api_errors: Vec<OneApiError>,
}
