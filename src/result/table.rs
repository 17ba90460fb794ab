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

//! Decoded result tables.

use std::ops::Index;

use crate::result::value::{ColumnType, KustoValue};
use crate::types::TableKind;

/// A result column: name and declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// One table of a response. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    id: i64,
    name: String,
    kind: TableKind,
    columns: Vec<Column>,
    rows: Vec<Vec<KustoValue>>,
}

impl ResultTable {
    pub(crate) fn new(
        id: i64,
        name: impl Into<String>,
        kind: TableKind,
        columns: Vec<Column>,
        rows: Vec<Vec<KustoValue>>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            columns,
            rows,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        self.rows.get(index).map(|cells| RowView {
            columns: &self.columns,
            cells,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |cells| RowView {
            columns: &self.columns,
            cells,
        })
    }

    /// Consume the table and return the raw rows.
    pub fn into_rows(self) -> Vec<Vec<KustoValue>> {
        self.rows
    }

    pub(crate) fn set_kind(&mut self, kind: TableKind) {
        self.kind = kind;
    }
}

/// A borrowed row, addressable by position or column name.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a [Column],
    cells: &'a [KustoValue],
}

impl<'a> RowView<'a> {
    /// Cell by column name.
    pub fn get(&self, name: &str) -> Option<&'a KustoValue> {
        let cells = self.cells;
        self.columns
            .iter()
            .position(|c| c.name == name)
            .and_then(|i| cells.get(i))
    }

    pub fn values(&self) -> &'a [KustoValue] {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Index<usize> for RowView<'_> {
    type Output = KustoValue;

    fn index(&self, index: usize) -> &Self::Output {
        &self.cells[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultTable {
        ResultTable::new(
            0,
            "Deft",
            TableKind::PrimaryResult,
            vec![
                Column::new("rownumber", ColumnType::Int),
                Column::new("xtext", ColumnType::String),
            ],
            vec![
                vec![KustoValue::Int(0), KustoValue::String("Zero".into())],
                vec![KustoValue::Int(1), KustoValue::Null],
            ],
        )
    }

    #[test]
    fn test_row_access() {
        let table = sample();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_index("xtext"), Some(1));

        let row = table.row(0).unwrap();
        assert_eq!(row[0], KustoValue::Int(0));
        assert_eq!(row.get("xtext").and_then(|v| v.as_str()), Some("Zero"));
        assert!(row.get("missing").is_none());

        let nulls: Vec<bool> = table.rows().map(|r| r[1].is_null()).collect();
        assert_eq!(nulls, vec![false, true]);
    }
}
