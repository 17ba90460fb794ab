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

//! Decides whether errors embedded in a response fail the call.

use tracing::{debug, warn};

use crate::error::{Result, ServiceError};
use crate::result::KustoResponseDataSet;
use crate::types::ClientRequestProperties;

/// Apply the partial-failure policy to a parsed response.
///
/// Unless the request set `deferpartialqueryfailures`, any embedded error
/// fails the whole call with a [`ServiceError`] whose code is the first
/// error's code and whose message joins every error message in frame
/// order. With deferral on, the dataset is returned as-is and the errors
/// stay readable through [`KustoResponseDataSet::partial_failures`].
pub fn apply_partial_failure_policy(
    dataset: KustoResponseDataSet,
    properties: Option<&ClientRequestProperties>,
) -> Result<KustoResponseDataSet> {
    if !dataset.has_errors() {
        return Ok(dataset);
    }

    let defer = properties.is_some_and(|p| p.defers_partial_query_failures());
    if defer {
        debug!(
            "Returning response with {} deferred partial failure(s)",
            dataset.errors_count()
        );
        return Ok(dataset);
    }

    let err = ServiceError::from_failures(dataset.partial_failures());
    warn!("Query failed: {}", err);
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::result::{parse_v1, parse_v2};
    use serde_json::json;

    fn dataset_with_errors() -> KustoResponseDataSet {
        let body = json!([
            {"FrameType": "DataSetHeader", "IsProgressive": false, "Version": "v2.0"},
            {"FrameType": "DataTable", "TableId": 0, "TableKind": "PrimaryResult",
             "TableName": "PrimaryResult",
             "Columns": [{"ColumnName": "x", "ColumnType": "int"}],
             "Rows": [[1], [2],
                {"OneApiErrors": [{"error": {"code": "LimitsExceeded", "message": "first"}}]}]},
            {"FrameType": "DataSetCompletion", "HasErrors": true, "Cancelled": false,
             "OneApiErrors": [{"error": {"code": "Other", "message": "second", "@permanent": true}}]}
        ])
        .to_string();
        parse_v2(&body).unwrap()
    }

    #[test]
    fn test_errors_fail_by_default() {
        for props in [None, Some(ClientRequestProperties::new())] {
            let err = apply_partial_failure_policy(dataset_with_errors(), props.as_ref())
                .unwrap_err();
            match err {
                Error::Service(err) => {
                    assert_eq!(err.code, "LimitsExceeded");
                    assert_eq!(err.message, "first; second");
                    assert!(err.permanent);
                }
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn test_deferred_errors_are_attached() {
        let props = ClientRequestProperties::new().with_defer_partial_query_failures(true);
        let dataset = apply_partial_failure_policy(dataset_with_errors(), Some(&props)).unwrap();
        assert_eq!(dataset.primary_result().unwrap().row_count(), 2);
        assert_eq!(dataset.errors_count(), 2);
    }

    #[test]
    fn test_clean_response_passes() {
        let body = json!([
            {"FrameType": "DataTable", "TableId": 0, "TableKind": "PrimaryResult",
             "TableName": "PrimaryResult",
             "Columns": [{"ColumnName": "x", "ColumnType": "int"}], "Rows": [[1]]}
        ])
        .to_string();
        let dataset = apply_partial_failure_policy(parse_v2(&body).unwrap(), None).unwrap();
        assert!(!dataset.has_errors());
    }

    fn embedded_error_responses() -> Vec<(&'static str, KustoResponseDataSet)> {
        let table_completion = json!([
            {"FrameType": "DataSetHeader", "IsProgressive": true, "Version": "v2.0"},
            {"FrameType": "TableHeader", "TableId": 1, "TableKind": "PrimaryResult",
             "TableName": "PrimaryResult",
             "Columns": [{"ColumnName": "n", "ColumnType": "int"}]},
            {"FrameType": "TableFragment", "TableId": 1, "FieldCount": 1,
             "TableFragmentType": "DataAppend", "Rows": [[1]]},
            {"FrameType": "TableCompletion", "TableId": 1, "RowCount": 1,
             "OneApiErrors": [{"error": {"code": "LimitsExceeded", "message": "too big"}}]},
            {"FrameType": "DataSetCompletion", "HasErrors": true, "Cancelled": false}
        ]);
        let cancelled = json!([
            {"FrameType": "DataSetHeader", "IsProgressive": false, "Version": "v2.0"},
            {"FrameType": "DataTable", "TableId": 0, "TableKind": "PrimaryResult",
             "TableName": "PrimaryResult",
             "Columns": [{"ColumnName": "x", "ColumnType": "int"}], "Rows": [[1]]},
            {"FrameType": "DataSetCompletion", "HasErrors": false, "Cancelled": true}
        ]);
        let v1_exceptions = json!({"Tables": [{
            "TableName": "Table_0",
            "Columns": [{"ColumnName": "x", "ColumnType": "int"}],
            "Rows": [[1], {"Exceptions": ["Partial query failure"]}]
        }]});

        vec![
            ("LimitsExceeded", parse_v2(&table_completion.to_string()).unwrap()),
            ("QueryFailed", parse_v2(&cancelled.to_string()).unwrap()),
            ("QueryFailed", parse_v1(&v1_exceptions.to_string()).unwrap()),
        ]
    }

    #[test]
    fn test_every_embedded_error_source_fails_without_deferral() {
        for (code, dataset) in embedded_error_responses() {
            match apply_partial_failure_policy(dataset, None) {
                Err(Error::Service(err)) => assert_eq!(err.code, code),
                other => panic!("expected {} failure, got {:?}", code, other),
            }
        }
    }

    #[test]
    fn test_every_embedded_error_source_is_deferrable() {
        let props = ClientRequestProperties::new().with_defer_partial_query_failures(true);
        for (code, dataset) in embedded_error_responses() {
            let dataset = apply_partial_failure_policy(dataset, Some(&props)).unwrap();
            assert_eq!(dataset.partial_failures()[0].code, code);
            assert_eq!(dataset.primary_result().unwrap().row_count(), 1);
        }
    }
}
