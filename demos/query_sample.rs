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

//! Query sample.
//!
//! Runs a query with deferred partial failures through the blocking client
//! and prints the primary result.
//!
//! ```bash
//! KUSTO_CLUSTER_URL=https://help.kusto.windows.net KUSTO_TOKEN=... \
//!     cargo run --example query_sample
//! ```

use kusto_client::{ClientBuilder, ClientRequestProperties};

fn main() {
    let cluster_url =
        std::env::var("KUSTO_CLUSTER_URL").expect("KUSTO_CLUSTER_URL environment variable required");
    let token = std::env::var("KUSTO_TOKEN").expect("KUSTO_TOKEN environment variable required");
    let database = std::env::var("KUSTO_DATABASE").unwrap_or_else(|_| "Samples".into());
    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "StormEvents | take 5".into());

    let mut builder = ClientBuilder::new()
        .with_cluster_url(cluster_url)
        .with_access_token(token)
        .with_application("query_sample");
    builder
        .set_option("kusto.log_level", "info")
        .expect("Failed to set log level");
    let client = builder.build_blocking().expect("Failed to build client");

    let props = ClientRequestProperties::new().with_defer_partial_query_failures(true);
    let dataset = client
        .execute(&database, &query, Some(&props))
        .expect("Query failed");

    for failure in dataset.partial_failures() {
        eprintln!("partial failure [{}]: {}", failure.code, failure.message);
    }

    let Some(table) = dataset.primary_result() else {
        println!("(no primary result)");
        return;
    };
    let header: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t"));
    for row in table.rows() {
        let cells: Vec<String> = row.values().iter().map(|v| format!("{:?}", v)).collect();
        println!("{}", cells.join("\t"));
    }
    println!("\n{} row(s)", table.row_count());
}
