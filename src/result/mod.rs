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

//! Parsed query responses.
//!
//! A raw response body goes through [`parse::parse_response`] to become a
//! [`KustoResponseDataSet`], and then through
//! [`policy::apply_partial_failure_policy`] which decides whether embedded
//! errors fail the call. Both steps are pure and shared by the async and
//! blocking clients.

pub mod parse;
pub mod policy;
pub mod table;
pub mod value;

pub use parse::{parse_error_body, parse_response, parse_v1, parse_v2};
pub use policy::apply_partial_failure_policy;
pub use table::{Column, ResultTable, RowView};
pub use value::{ColumnType, DynamicValue, KustoValue};

use crate::types::TableKind;

/// Which frame protocol produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseVersion {
    /// Management endpoint, `{"Tables": [...]}`.
    V1,
    /// Query endpoint, an array of frames.
    V2,
}

/// Where in the response an error was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureSource {
    /// An error object in place of a data row.
    DataRow { table: String },
    /// `OneApiErrors` on a `TableCompletion` frame.
    TableCompletion { table: String },
    /// A `QueryCompletionInformation` row at error level.
    CompletionInformation,
    /// `DataSetCompletion` frame.
    DataSetCompletion,
    /// A V1 `QueryStatus` row.
    QueryStatus,
    /// A top-level error payload in place of the response.
    Response,
}

/// An error embedded in an otherwise successful response.
///
/// Only reachable through [`KustoResponseDataSet::partial_failures`] when
/// the request deferred partial failures; otherwise these are folded into a
/// [`ServiceError`](crate::error::ServiceError).
#[derive(Debug, Clone, PartialEq)]
pub struct PartialFailure {
    pub code: String,
    pub message: String,
    /// Longer service-provided description, when present.
    pub description: Option<String>,
    pub permanent: bool,
    pub source: FailureSource,
}

/// All tables returned by one query or command, plus any embedded errors.
#[derive(Debug, Clone, PartialEq)]
pub struct KustoResponseDataSet {
    version: ResponseVersion,
    tables: Vec<ResultTable>,
    failures: Vec<PartialFailure>,
}

impl KustoResponseDataSet {
    pub(crate) fn new(
        version: ResponseVersion,
        tables: Vec<ResultTable>,
        failures: Vec<PartialFailure>,
    ) -> Self {
        Self {
            version,
            tables,
            failures,
        }
    }

    pub fn version(&self) -> ResponseVersion {
        self.version
    }

    /// Every table in response order.
    pub fn tables(&self) -> &[ResultTable] {
        &self.tables
    }

    /// Tables holding the caller's query output.
    pub fn primary_results(&self) -> impl Iterator<Item = &ResultTable> {
        self.tables
            .iter()
            .filter(|t| t.kind() == TableKind::PrimaryResult)
    }

    /// The first primary result. Always present on a parsed response.
    pub fn primary_result(&self) -> Option<&ResultTable> {
        self.primary_results().next()
    }

    /// First table of the given kind.
    pub fn table_by_kind(&self, kind: TableKind) -> Option<&ResultTable> {
        self.tables.iter().find(|t| t.kind() == kind)
    }

    pub fn table_by_name(&self, name: &str) -> Option<&ResultTable> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn errors_count(&self) -> usize {
        self.failures.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn partial_failures(&self) -> &[PartialFailure] {
        &self.failures
    }

    /// Consume the response and return its tables.
    pub fn into_tables(self) -> Vec<ResultTable> {
        self.tables
    }
}
