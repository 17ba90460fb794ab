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

//! Response parsing for both frame protocols.
//!
//! V2 (query endpoint) bodies are a JSON array of frames; tables arrive
//! either whole (`DataTable`) or progressively (`TableHeader`, then
//! `TableFragment`s, then `TableCompletion`). V1 (management endpoint)
//! bodies are `{"Tables": [...]}` with an optional trailing table of
//! contents.
//!
//! Embedded errors are never returned as data rows. They are collected
//! in frame order as [`PartialFailure`]s on the dataset and left for the
//! partial-failure policy to act on.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result, ServiceError};
use crate::result::table::{Column, ResultTable};
use crate::result::value::{decode_cell, ColumnType, KustoValue};
use crate::result::{FailureSource, KustoResponseDataSet, PartialFailure, ResponseVersion};
use crate::types::v1::{V1Column, V1ExceptionRow, V1Response, V1Table};
use crate::types::v2::{
    ColumnV2, Frame, InlineErrorRow, OneApiError, TableFragmentType, TableHeader, TableKind,
};

/// Maximum number of body characters echoed into parse errors.
const BODY_PREVIEW_LEN: usize = 512;

/// `QueryCompletionInformation` rows at or below this level are errors
/// (1 = Critical, 2 = Error).
const COMPLETION_ERROR_LEVEL: i64 = 2;

/// V1 `QueryStatus` rows below this severity are errors.
const QUERY_STATUS_ERROR_SEVERITY: i64 = 4;

/// Parse a response body produced by an endpoint of the given version.
pub fn parse_response(body: &str, version: ResponseVersion) -> Result<KustoResponseDataSet> {
    match version {
        ResponseVersion::V1 => parse_v1(body),
        ResponseVersion::V2 => parse_v2(body),
    }
}

/// Turn a non-success HTTP response into an error.
///
/// A body carrying the service's `{"error": {...}}` payload becomes
/// [`Error::Service`]; anything else is [`Error::Http`].
pub fn parse_error_body(status: u16, body: &str) -> Error {
    match top_level_error(body) {
        Some(err) => Error::Service(err),
        None => Error::Http {
            status,
            body: body.to_string(),
        },
    }
}

fn top_level_error(body: &str) -> Option<ServiceError> {
    if !body.trim_start().starts_with('{') {
        return None;
    }
    let err: OneApiError = serde_json::from_str(body).ok()?;
    let failure = failure_from_one_api(err, FailureSource::Response);
    Some(ServiceError::from_failures(&[failure]))
}

/// Parse a V2 frame array.
pub fn parse_v2(body: &str) -> Result<KustoResponseDataSet> {
    if let Some(err) = top_level_error(body) {
        return Err(err.into());
    }

    let frames: Vec<Frame> = serde_json::from_str(body).map_err(|e| {
        Error::parse(format!(
            "Failed to parse V2 response: {} - body: {}",
            e,
            preview(body)
        ))
    })?;

    let mut tables = Vec::new();
    let mut failures = Vec::new();
    let mut pending: Vec<PendingTable> = Vec::new();
    let mut dataset_has_errors = false;
    let mut cancelled = false;

    for frame in frames {
        match frame {
            Frame::DataSetHeader(header) => {
                debug!(
                    "V2 dataset header: version={}, progressive={}",
                    header.version, header.is_progressive
                );
            }
            Frame::DataTable(table) => {
                let built = build_v2_table(
                    table.table_id,
                    table.table_name,
                    table.table_kind,
                    &table.columns,
                    table.rows,
                    &mut failures,
                )?;
                tables.push(built);
            }
            Frame::TableHeader(header) => {
                pending.push(PendingTable {
                    header,
                    rows: Vec::new(),
                });
            }
            Frame::TableFragment(fragment) => {
                let table = pending
                    .iter_mut()
                    .find(|p| p.header.table_id == fragment.table_id)
                    .ok_or_else(|| {
                        Error::parse(format!(
                            "TableFragment for unknown table id {}",
                            fragment.table_id
                        ))
                    })?;
                if fragment.table_fragment_type == TableFragmentType::DataReplace {
                    table.rows.clear();
                }
                table.rows.extend(fragment.rows);
            }
            Frame::TableProgress(_) => {}
            Frame::TableCompletion(completion) => {
                let index = pending
                    .iter()
                    .position(|p| p.header.table_id == completion.table_id)
                    .ok_or_else(|| {
                        Error::parse(format!(
                            "TableCompletion for unknown table id {}",
                            completion.table_id
                        ))
                    })?;
                let PendingTable { header, rows } = pending.remove(index);
                let name = header.table_name.clone();
                let built = build_v2_table(
                    header.table_id,
                    header.table_name,
                    header.table_kind,
                    &header.columns,
                    rows,
                    &mut failures,
                )?;
                tables.push(built);
                for err in completion.one_api_errors.unwrap_or_default() {
                    failures.push(failure_from_one_api(
                        err,
                        FailureSource::TableCompletion {
                            table: name.clone(),
                        },
                    ));
                }
            }
            Frame::DataSetCompletion(completion) => {
                dataset_has_errors = completion.has_errors || completion.cancelled;
                cancelled = completion.cancelled;
                for err in completion.one_api_errors.unwrap_or_default() {
                    failures.push(failure_from_one_api(err, FailureSource::DataSetCompletion));
                }
            }
            Frame::Unknown => debug!("Skipping V2 frame of unknown type"),
        }
    }

    if !pending.is_empty() {
        warn!(
            "{} progressive table(s) never completed; dropping them",
            pending.len()
        );
    }

    if failures.is_empty() {
        failures.extend(completion_information_failures(&tables));
    }
    if failures.is_empty() && dataset_has_errors {
        let message = if cancelled {
            "Query was cancelled"
        } else {
            "Query completed with errors"
        };
        failures.push(PartialFailure {
            code: "QueryFailed".to_string(),
            message: message.to_string(),
            description: None,
            permanent: false,
            source: FailureSource::DataSetCompletion,
        });
    }

    finish(ResponseVersion::V2, tables, failures)
}

/// Parse a V1 `{"Tables": [...]}` body.
pub fn parse_v1(body: &str) -> Result<KustoResponseDataSet> {
    if let Some(err) = top_level_error(body) {
        return Err(err.into());
    }

    let response: V1Response = serde_json::from_str(body).map_err(|e| {
        Error::parse(format!(
            "Failed to parse V1 response: {} - body: {}",
            e,
            preview(body)
        ))
    })?;

    let mut failures = Vec::new();
    let mut tables = Vec::with_capacity(response.tables.len());
    for (index, table) in response.tables.into_iter().enumerate() {
        tables.push(build_v1_table(index as i64, table, &mut failures)?);
    }

    classify_v1_tables(&mut tables);

    for table in tables.iter().filter(|t| t.kind() == TableKind::QueryStatus) {
        failures.extend(query_status_failures(table));
    }

    finish(ResponseVersion::V1, tables, failures)
}

struct PendingTable {
    header: TableHeader,
    rows: Vec<Value>,
}

fn finish(
    version: ResponseVersion,
    tables: Vec<ResultTable>,
    failures: Vec<PartialFailure>,
) -> Result<KustoResponseDataSet> {
    let failures = dedup_failures(failures);

    if !tables.iter().any(|t| t.kind() == TableKind::PrimaryResult) {
        if !failures.is_empty() {
            return Err(ServiceError::from_failures(&failures).into());
        }
        return Err(Error::parse("Response contained no primary result table"));
    }

    debug!(
        "Parsed {:?} response: {} table(s), {} error(s)",
        version,
        tables.len(),
        failures.len()
    );
    Ok(KustoResponseDataSet::new(version, tables, failures))
}

fn dedup_failures(failures: Vec<PartialFailure>) -> Vec<PartialFailure> {
    let mut unique: Vec<PartialFailure> = Vec::with_capacity(failures.len());
    for failure in failures {
        if !unique
            .iter()
            .any(|f| f.code == failure.code && f.message == failure.message)
        {
            unique.push(failure);
        }
    }
    unique
}

fn failure_from_one_api(err: OneApiError, source: FailureSource) -> PartialFailure {
    PartialFailure {
        code: err.error.code,
        message: err.error.message,
        description: err.error.description,
        permanent: err.error.permanent,
        source,
    }
}

fn build_v2_table(
    id: i64,
    name: String,
    kind: TableKind,
    columns: &[ColumnV2],
    rows: Vec<Value>,
    failures: &mut Vec<PartialFailure>,
) -> Result<ResultTable> {
    let columns: Vec<Column> = columns
        .iter()
        .map(|c| {
            let column_type = ColumnType::from_kusto_name(&c.column_type).unwrap_or_else(|| {
                debug!(
                    "Unknown column type '{}' for {}; decoding as dynamic",
                    c.column_type, c.column_name
                );
                ColumnType::Dynamic
            });
            Column::new(c.column_name.clone(), column_type)
        })
        .collect();

    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Value::Array(cells) => decoded.push(decode_row(&name, &columns, cells)?),
            Value::Object(_) => {
                let inline: InlineErrorRow = serde_json::from_value(row).map_err(|e| {
                    Error::parse(format!("Unrecognized object row in table {}: {}", name, e))
                })?;
                for err in inline.one_api_errors {
                    failures.push(failure_from_one_api(
                        err,
                        FailureSource::DataRow {
                            table: name.clone(),
                        },
                    ));
                }
            }
            other => {
                return Err(Error::parse(format!(
                    "Unexpected row in table {}: {}",
                    name, other
                )))
            }
        }
    }

    Ok(ResultTable::new(id, name, kind, columns, decoded))
}

fn build_v1_table(
    id: i64,
    table: V1Table,
    failures: &mut Vec<PartialFailure>,
) -> Result<ResultTable> {
    let V1Table {
        table_name,
        columns,
        rows,
    } = table;
    let columns: Vec<Column> = columns.iter().map(v1_column).collect();

    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Value::Array(cells) => decoded.push(decode_row(&table_name, &columns, cells)?),
            Value::Object(_) => {
                let exceptions: V1ExceptionRow = serde_json::from_value(row).map_err(|e| {
                    Error::parse(format!(
                        "Unrecognized object row in table {}: {}",
                        table_name, e
                    ))
                })?;
                for message in exceptions.exceptions {
                    failures.push(PartialFailure {
                        code: "QueryFailed".to_string(),
                        message,
                        description: None,
                        permanent: false,
                        source: FailureSource::DataRow {
                            table: table_name.clone(),
                        },
                    });
                }
            }
            other => {
                return Err(Error::parse(format!(
                    "Unexpected row in table {}: {}",
                    table_name, other
                )))
            }
        }
    }

    // Kind is assigned once the table of contents has been read.
    Ok(ResultTable::new(
        id,
        table_name,
        TableKind::PrimaryResult,
        columns,
        decoded,
    ))
}

fn v1_column(column: &V1Column) -> Column {
    let column_type = column
        .column_type
        .as_deref()
        .and_then(ColumnType::from_kusto_name)
        .or_else(|| column.data_type.as_deref().and_then(ColumnType::from_clr_name))
        .unwrap_or(ColumnType::Dynamic);
    Column::new(column.column_name.clone(), column_type)
}

fn decode_row(table: &str, columns: &[Column], cells: Vec<Value>) -> Result<Vec<KustoValue>> {
    if cells.len() != columns.len() {
        return Err(Error::parse(format!(
            "Row in table {} has {} cells, expected {}",
            table,
            cells.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .zip(cells)
        .map(|(column, cell)| {
            decode_cell(column.column_type, cell).map_err(|e| match e {
                Error::Parse(msg) => {
                    Error::Parse(format!("{} (table {}, column {})", msg, table, column.name))
                }
                other => other,
            })
        })
        .collect()
}

/// Assign table kinds from the trailing table of contents, if there is one.
fn classify_v1_tables(tables: &mut [ResultTable]) {
    let Some((toc, data)) = tables.split_last_mut() else {
        return;
    };
    if data.is_empty() {
        return;
    }
    let (Some(ordinal_idx), Some(kind_idx)) = (toc.column_index("Ordinal"), toc.column_index("Kind"))
    else {
        return;
    };

    let entries: Vec<(usize, TableKind)> = toc
        .rows()
        .filter_map(|row| {
            let ordinal = usize::try_from(row[ordinal_idx].as_i64()?).ok()?;
            let kind = match row[kind_idx].as_str()? {
                "QueryResult" => TableKind::PrimaryResult,
                "QueryProperties" => TableKind::QueryProperties,
                "QueryStatus" => TableKind::QueryStatus,
                "QueryPlan" => TableKind::QueryPlan,
                "QueryTraceLog" => TableKind::QueryTraceLog,
                "QueryPerfLog" => TableKind::QueryPerfLog,
                _ => TableKind::Unknown,
            };
            Some((ordinal, kind))
        })
        .collect();

    toc.set_kind(TableKind::TableOfContents);
    for table in data.iter_mut() {
        table.set_kind(TableKind::Unknown);
    }
    for (ordinal, kind) in entries {
        match data.get_mut(ordinal) {
            Some(table) => table.set_kind(kind),
            None => warn!("Table of contents references missing table {}", ordinal),
        }
    }
}

fn query_status_failures(table: &ResultTable) -> Vec<PartialFailure> {
    let Some(severity_idx) = table.column_index("Severity") else {
        return Vec::new();
    };
    let code_idx = table.column_index("StatusCode");
    let description_idx = table.column_index("StatusDescription");

    table
        .rows()
        .filter(|row| {
            row[severity_idx]
                .as_i64()
                .is_some_and(|s| s < QUERY_STATUS_ERROR_SEVERITY)
        })
        .map(|row| {
            let code = code_idx
                .map(|i| cell_text(&row[i]))
                .unwrap_or_else(|| "QueryFailed".to_string());
            let message = description_idx
                .map(|i| cell_text(&row[i]))
                .unwrap_or_else(|| "Query status reported an error".to_string());
            PartialFailure {
                code,
                message,
                description: None,
                permanent: false,
                source: FailureSource::QueryStatus,
            }
        })
        .collect()
}

fn completion_information_failures(tables: &[ResultTable]) -> Vec<PartialFailure> {
    let Some(table) = tables
        .iter()
        .find(|t| t.kind() == TableKind::QueryCompletionInformation)
    else {
        return Vec::new();
    };
    let Some(level_idx) = table.column_index("Level") else {
        return Vec::new();
    };
    let code_idx = table.column_index("StatusCodeName");
    let payload_idx = table.column_index("Payload");

    table
        .rows()
        .filter(|row| {
            row[level_idx]
                .as_i64()
                .is_some_and(|level| level <= COMPLETION_ERROR_LEVEL)
        })
        .map(|row| {
            let code = code_idx
                .map(|i| cell_text(&row[i]))
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "QueryFailed".to_string());
            let (message, description) = payload_idx
                .map(|i| payload_message(&row[i]))
                .unwrap_or_else(|| ("Query completed with errors".to_string(), None));
            PartialFailure {
                code,
                message,
                description,
                permanent: false,
                source: FailureSource::CompletionInformation,
            }
        })
        .collect()
}

/// Extract a message from a completion-information payload, which is
/// either plain text or a JSON `{"error": {...}}` document.
fn payload_message(cell: &KustoValue) -> (String, Option<String>) {
    let text = cell_text(cell);
    match serde_json::from_str::<OneApiError>(&text) {
        Ok(err) => (err.error.message, err.error.description),
        Err(_) => (text, None),
    }
}

fn cell_text(cell: &KustoValue) -> String {
    match cell {
        KustoValue::Null => String::new(),
        KustoValue::Int(i) => i.to_string(),
        KustoValue::Long(l) => l.to_string(),
        KustoValue::Dynamic(d) => match d.as_str() {
            Some(s) => s.to_string(),
            None => d.to_json().to_string(),
        },
        other => other.as_str().map(str::to_string).unwrap_or_default(),
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}
