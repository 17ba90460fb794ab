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

//! Streaming ingestion example.
//!
//! Streams a few CSV rows into a table and counts the rows afterwards.
//! The table must exist and have streaming ingestion enabled.
//!
//! ```bash
//! KUSTO_CLUSTER_URL=https://mycluster.kusto.windows.net KUSTO_TOKEN=... \
//!     KUSTO_DATABASE=db KUSTO_TABLE=Events cargo run --example streaming_ingest
//! ```

use kusto_client::ingest::{DataFormat, IngestionProperties, StreamDescriptor, StreamingIngestClient};
use kusto_client::ClientBuilder;

#[tokio::main]
async fn main() {
    let cluster_url =
        std::env::var("KUSTO_CLUSTER_URL").expect("KUSTO_CLUSTER_URL environment variable required");
    let token = std::env::var("KUSTO_TOKEN").expect("KUSTO_TOKEN environment variable required");
    let database = std::env::var("KUSTO_DATABASE").expect("KUSTO_DATABASE environment variable required");
    let table = std::env::var("KUSTO_TABLE").expect("KUSTO_TABLE environment variable required");

    let client = ClientBuilder::new()
        .with_cluster_url(cluster_url)
        .with_access_token(token)
        .build()
        .expect("Failed to build client");
    let ingest = StreamingIngestClient::new(client.clone());

    let props = IngestionProperties::new(&database, &table).with_format(DataFormat::Csv);
    let data = "alpha,1\nbeta,2\ngamma,3\n";
    let result = ingest
        .ingest_from_stream(StreamDescriptor::new(data.as_bytes().to_vec(), false, None), &props)
        .await
        .expect("Streaming ingestion failed");
    println!("Ingested {} ({:?})", result.source_id, result.status);

    let dataset = client
        .execute(&database, &format!("{} | count", table), None)
        .await
        .expect("Count query failed");
    if let Some(row) = dataset.primary_result().and_then(|t| t.row(0)) {
        println!("{} now has {:?} row(s)", table, row[0].as_i64());
    }
}
