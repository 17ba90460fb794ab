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

//! Request-side types: the JSON body posted to the query/management
//! endpoints and the per-request property bag.

use crate::error::{Error, Result};
use crate::result::value::{format_timespan, parse_timespan};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Wire name of the deferred-partial-failure option.
pub const DEFER_PARTIAL_QUERY_FAILURES_OPTION: &str = "deferpartialqueryfailures";
pub const SERVER_TIMEOUT_OPTION: &str = "servertimeout";
pub const NO_REQUEST_TIMEOUT_OPTION: &str = "norequesttimeout";
pub const QUERY_CONSISTENCY_OPTION: &str = "queryconsistency";

/// Body of a query or management request.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequestBody {
    pub db: String,
    pub csl: String,
    /// `ClientRequestProperties` serialized to a JSON string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<String>,
}

/// Per-request options sent alongside a query or command.
///
/// Well-known options are typed fields; anything else goes through
/// [`set_option`](Self::set_option) and is forwarded verbatim. Created per
/// request by the caller and only read once sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientRequestProperties {
    /// Return partial results with embedded errors instead of failing.
    pub results_defer_partial_query_failures: Option<bool>,
    /// Server-side execution timeout.
    pub server_timeout: Option<Duration>,
    pub no_request_timeout: Option<bool>,
    /// "strongconsistency" or "weakconsistency".
    pub query_consistency: Option<String>,
    /// Sent as `x-ms-client-request-id`; generated when unset.
    pub client_request_id: Option<String>,
    /// Sent as `x-ms-app`.
    pub application: Option<String>,
    /// Sent as `x-ms-user`.
    pub user: Option<String>,
    options: BTreeMap<String, Value>,
    parameters: BTreeMap<String, String>,
}

impl ClientRequestProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether partial query failures should be returned on the response.
    pub fn defers_partial_query_failures(&self) -> bool {
        self.results_defer_partial_query_failures.unwrap_or(false)
    }

    pub fn with_defer_partial_query_failures(mut self, defer: bool) -> Self {
        self.results_defer_partial_query_failures = Some(defer);
        self
    }

    pub fn with_server_timeout(mut self, timeout: Duration) -> Self {
        self.server_timeout = Some(timeout);
        self
    }

    pub fn with_client_request_id(mut self, id: impl Into<String>) -> Self {
        self.client_request_id = Some(id.into());
        self
    }

    /// Set an option by its wire name.
    ///
    /// Well-known names are routed to the typed fields and type-checked;
    /// unknown names are stored as-is.
    pub fn set_option(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match name {
            DEFER_PARTIAL_QUERY_FAILURES_OPTION => {
                self.results_defer_partial_query_failures = Some(expect_bool(name, &value)?);
            }
            NO_REQUEST_TIMEOUT_OPTION => {
                self.no_request_timeout = Some(expect_bool(name, &value)?);
            }
            SERVER_TIMEOUT_OPTION => {
                let text = expect_str(name, &value)?;
                let timeout = parse_timespan(text)
                    .and_then(|d| d.to_std().ok())
                    .ok_or_else(|| {
                        Error::invalid_argument(format!("Invalid timespan for {}: {}", name, text))
                    })?;
                self.server_timeout = Some(timeout);
            }
            QUERY_CONSISTENCY_OPTION => {
                self.query_consistency = Some(expect_str(name, &value)?.to_string());
            }
            _ => {
                self.options.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    /// Look up an option by its wire name.
    pub fn get_option(&self, name: &str) -> Option<Value> {
        self.options_map().remove(name)
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.get_option(name).is_some()
    }

    /// Set a query parameter. The value is a KQL literal, e.g. `"int(5)"`.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    fn options_map(&self) -> Map<String, Value> {
        let mut map: Map<String, Value> = self
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(defer) = self.results_defer_partial_query_failures {
            map.insert(DEFER_PARTIAL_QUERY_FAILURES_OPTION.into(), Value::Bool(defer));
        }
        if let Some(no_timeout) = self.no_request_timeout {
            map.insert(NO_REQUEST_TIMEOUT_OPTION.into(), Value::Bool(no_timeout));
        }
        if let Some(timeout) = self.server_timeout {
            map.insert(
                SERVER_TIMEOUT_OPTION.into(),
                Value::String(format_timespan(timeout)),
            );
        }
        if let Some(ref consistency) = self.query_consistency {
            map.insert(
                QUERY_CONSISTENCY_OPTION.into(),
                Value::String(consistency.clone()),
            );
        }
        map
    }

    /// Serialize to the `{"Options": ..., "Parameters": ...}` wire form.
    pub fn to_json(&self) -> String {
        let parameters: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let mut root = Map::new();
        root.insert("Options".into(), Value::Object(self.options_map()));
        root.insert("Parameters".into(), Value::Object(parameters));
        Value::Object(root).to_string()
    }
}

fn expect_bool(name: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(Error::invalid_argument(format!(
            "Option {} expects a boolean, got {}",
            name, other
        ))),
    }
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        Error::invalid_argument(format!("Option {} expects a string, got {}", name, value))
    })
}
