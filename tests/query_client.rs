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

//! Query client behavior against canned service responses.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{error_row, v2_frames, MockBackend};
use kusto_client::client::Endpoint;
use kusto_client::{
    BlockingKustoClient, ClientRequestProperties, DynamicValue, Error, KustoClient, KustoValue,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

const QUERY: &str = "StormEvents | take 2";

fn partial_failure_body() -> String {
    v2_frames(
        json!([
            [1, "a", null],
            [2, "b", "{\"k\":\"v\"}"],
            error_row("LimitsExceeded", "Query result set has exceeded the internal record count limit.")
        ]),
        true,
    )
}

#[tokio::test]
async fn test_rows_round_trip_with_nulls() {
    let body = v2_frames(json!([[1, "a", null], [null, null, null]]), false);
    let client = KustoClient::new(Arc::new(MockBackend::new().respond(QUERY, body)));

    let dataset = client.execute("db", QUERY, None).await.unwrap();
    assert!(!dataset.has_errors());
    let primary = dataset.primary_result().unwrap();
    assert_eq!(primary.row_count(), 2);

    let first = primary.row(0).unwrap();
    assert_eq!(first.get("x"), Some(&KustoValue::Long(1)));
    assert_eq!(first.get("s"), Some(&KustoValue::String("a".to_string())));
    assert!(first.get("d").unwrap().is_null());

    let second = primary.row(1).unwrap();
    assert!(second.values().iter().all(KustoValue::is_null));
}

#[tokio::test]
async fn test_empty_result_table_is_present() {
    let query = "print 'a' | take 0";
    let body = v2_frames(json!([]), false);
    let client = KustoClient::new(Arc::new(MockBackend::new().respond(query, body)));

    let dataset = client.execute_query("db", query, None).await.unwrap();
    let primary = dataset.primary_result().expect("primary result present");
    assert!(primary.is_empty());
    assert_eq!(primary.columns().len(), 3);
    assert!(!dataset.has_errors());
}

#[tokio::test]
async fn test_partial_failure_is_fatal_by_default() {
    let client = KustoClient::new(Arc::new(
        MockBackend::new().respond(QUERY, partial_failure_body()),
    ));

    let err = client.execute("db", QUERY, None).await.unwrap_err();
    let service = err.as_service_error().expect("service error");
    assert_eq!(service.code, "LimitsExceeded");
    assert!(service.message.contains("record count limit"));
    assert!(!service.permanent);

    let props = ClientRequestProperties::new().with_defer_partial_query_failures(false);
    let err = client.execute("db", QUERY, Some(&props)).await.unwrap_err();
    assert!(matches!(err, Error::Service(_)));
}

#[tokio::test]
async fn test_partial_failure_deferred_returns_rows() {
    let client = KustoClient::new(Arc::new(
        MockBackend::new().respond(QUERY, partial_failure_body()),
    ));
    let props = ClientRequestProperties::new().with_defer_partial_query_failures(true);

    let dataset = client.execute("db", QUERY, Some(&props)).await.unwrap();
    let primary = dataset.primary_result().unwrap();
    assert_eq!(primary.row_count(), 2);
    assert!(dataset.has_errors());
    assert_eq!(dataset.errors_count(), 1);
    assert_eq!(dataset.partial_failures()[0].code, "LimitsExceeded");
}

#[tokio::test]
async fn test_dynamic_column_decode() {
    let body = v2_frames(
        json!([
            [1, "int", 123],
            [2, "quoted int", "123"],
            [3, "bad json", "test bad json"],
            [4, "null", null],
            [5, "object", "{\"a\":1}"]
        ]),
        false,
    );
    let client = KustoClient::new(Arc::new(MockBackend::new().respond(QUERY, body)));
    let dataset = client.execute("db", QUERY, None).await.unwrap();
    let primary = dataset.primary_result().unwrap();

    let dynamic = |row: usize| match primary.row(row).unwrap().get("d") {
        Some(KustoValue::Dynamic(d)) => d.clone(),
        Some(KustoValue::Null) => DynamicValue::Null,
        other => panic!("unexpected cell {:?}", other),
    };

    assert_eq!(dynamic(0).as_i64(), Some(123));
    assert_eq!(dynamic(1), DynamicValue::String("123".to_string()));
    assert!(matches!(dynamic(2), DynamicValue::RawFallback(ref s) if s == "test bad json"));
    assert!(dynamic(3).is_null());
    let object = dynamic(4);
    assert_eq!(object.as_object().unwrap()["a"], json!(1));
}

#[tokio::test]
async fn test_management_command_dispatch() {
    let command = ".show tables";
    let body = json!({"Tables": [{
        "TableName": "Table_0",
        "Columns": [{"ColumnName": "TableName", "DataType": "String", "ColumnType": "string"},
                    {"ColumnName": "DatabaseName", "DataType": "String", "ColumnType": "string"}],
        "Rows": [["StormEvents", "Samples"]]
    }]})
    .to_string();
    let backend = Arc::new(MockBackend::new().respond(command, body));
    let client = KustoClient::new(backend.clone());

    let dataset = client.execute("Samples", command, None).await.unwrap();
    assert_eq!(dataset.primary_result().unwrap().row_count(), 1);

    let requests = backend.requests();
    assert_eq!(requests[0].endpoint, Endpoint::Management);
    assert_eq!(requests[0].database, "Samples");
}

#[tokio::test]
async fn test_service_error_response() {
    let body = json!({"error": {
        "code": "BadRequest_SyntaxError",
        "message": "Request is invalid and cannot be executed.",
        "@permanent": true
    }})
    .to_string();
    let client = KustoClient::new(Arc::new(
        MockBackend::new().respond_with_status("bad |", 400, body),
    ));

    let err = client.execute("db", "bad |", None).await.unwrap_err();
    let service = err.as_service_error().unwrap();
    assert_eq!(service.code, "BadRequest_SyntaxError");
    assert!(service.permanent);
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let backend = Arc::new(MockBackend::new());
    let client = KustoClient::new(backend.clone());
    let err = client.execute("db", "  ", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(backend.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation() {
    let body = v2_frames(json!([]), false);
    let backend = MockBackend::new()
        .with_delay(Duration::from_secs(30))
        .respond(QUERY, body);
    let client = KustoClient::new(Arc::new(backend));

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        })
    };

    let err = client
        .execute_with_cancellation("db", QUERY, None, &token)
        .await
        .unwrap_err();
    canceller.await.unwrap();
    assert!(matches!(err, Error::Cancelled));

    // The client is still usable after a cancelled call.
    let fresh = CancellationToken::new();
    let dataset = client
        .execute_with_cancellation("db", QUERY, None, &fresh)
        .await
        .unwrap();
    assert!(dataset.primary_result().is_some());
}

#[test]
fn test_blocking_client_matches_async() {
    let props = ClientRequestProperties::new().with_defer_partial_query_failures(true);
    let backend = Arc::new(MockBackend::new().respond(QUERY, partial_failure_body()));

    let blocking = BlockingKustoClient::new(backend.clone()).unwrap();
    let from_blocking = blocking.execute("db", QUERY, Some(&props)).unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let client = KustoClient::new(backend);
    let from_async = runtime
        .block_on(client.execute("db", QUERY, Some(&props)))
        .unwrap();

    assert_eq!(from_blocking, from_async);
    assert!(blocking.execute("db", QUERY, None).is_err());
}
