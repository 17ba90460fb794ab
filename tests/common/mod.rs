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

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use kusto_client::client::{KustoBackend, KustoRequest, StreamingIngestRequest};
use kusto_client::result::parse_error_body;
use kusto_client::Result;
use serde_json::{json, Value};

/// Backend answering from canned bodies keyed by request text.
#[derive(Debug, Default)]
pub struct MockBackend {
    responses: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<KustoRequest>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before answering any request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(self, text: &str, body: impl Into<String>) -> Self {
        self.respond_with_status(text, 200, body)
    }

    pub fn respond_with_status(self, text: &str, status: u16, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(text.to_string(), (status, body.into()));
        self
    }

    pub fn requests(&self) -> Vec<KustoRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl KustoBackend for MockBackend {
    fn cluster_url(&self) -> &str {
        "https://mock.kusto.windows.net"
    }

    async fn execute(&self, request: &KustoRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.responses.lock().unwrap().get(&request.text).cloned();
        match response {
            Some((200, body)) => Ok(body),
            Some((status, body)) => Err(parse_error_body(status, &body)),
            None => Err(parse_error_body(404, "no canned response")),
        }
    }

    async fn stream_ingest(&self, _request: &StreamingIngestRequest) -> Result<String> {
        Ok(json!({"Tables": [{"TableName": "Table_0", "Columns": [], "Rows": []}]}).to_string())
    }
}

/// V2 frames with one primary result over `x:long, s:string, d:dynamic`.
pub fn v2_frames(rows: Value, has_errors: bool) -> String {
    json!([
        {"FrameType": "DataSetHeader", "IsProgressive": false, "Version": "v2.0"},
        {"FrameType": "DataTable", "TableId": 0, "TableKind": "QueryProperties",
         "TableName": "@ExtendedProperties",
         "Columns": [{"ColumnName": "TableId", "ColumnType": "int"},
                     {"ColumnName": "Key", "ColumnType": "string"},
                     {"ColumnName": "Value", "ColumnType": "dynamic"}],
         "Rows": [[1, "Visualization", "{\"Visualization\":null}"]]},
        {"FrameType": "DataTable", "TableId": 1, "TableKind": "PrimaryResult",
         "TableName": "PrimaryResult",
         "Columns": [{"ColumnName": "x", "ColumnType": "long"},
                     {"ColumnName": "s", "ColumnType": "string"},
                     {"ColumnName": "d", "ColumnType": "dynamic"}],
         "Rows": rows},
        {"FrameType": "DataTable", "TableId": 2, "TableKind": "QueryCompletionInformation",
         "TableName": "QueryCompletionInformation",
         "Columns": [{"ColumnName": "Timestamp", "ColumnType": "datetime"},
                     {"ColumnName": "Level", "ColumnType": "int"},
                     {"ColumnName": "StatusCodeName", "ColumnType": "string"},
                     {"ColumnName": "Payload", "ColumnType": "string"}],
         "Rows": [["2024-01-01T00:00:00.0000000Z", 4, "S_OK (0)", "{\"Count\":1}"]]},
        {"FrameType": "DataSetCompletion", "HasErrors": has_errors, "Cancelled": false}
    ])
    .to_string()
}

/// An error object in place of a data row.
pub fn error_row(code: &str, message: &str) -> Value {
    json!({"OneApiErrors": [{"error": {
        "code": code,
        "message": message,
        "@type": "Kusto.Data.Exceptions.KustoServicePartialQueryFailureLimitsExceededException",
        "@permanent": false
    }}]})
}
