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

//! Error types for the Kusto client.
//!
//! `Error` is the single error type returned by every fallible operation in
//! the crate. Query failures reported by the service surface as
//! [`Error::Service`]; partial failures that the caller asked to defer are not
//! errors at all and live on the response (see
//! [`crate::result::PartialFailure`]).

use crate::result::PartialFailure;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the query and ingestion clients.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service rejected the request or reported errors inside the response.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
    /// Non-success HTTP status whose body was not a service error payload.
    #[error("HTTP {status} - {body}")]
    Http { status: u16, body: String },
    /// Transport failure from the HTTP stack.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Returns the service error if this is one.
    pub fn as_service_error(&self) -> Option<&ServiceError> {
        match self {
            Error::Service(e) => Some(e),
            _ => None,
        }
    }
}

/// A fatal error reported by the service.
///
/// When several errors are embedded in one response they are folded into a
/// single `ServiceError`: `code` is the first error's code and `message`
/// joins every message in the order the frames carried them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct ServiceError {
    pub code: String,
    pub message: String,
    /// True if retrying the same request cannot succeed.
    pub permanent: bool,
    /// The individual failures this error was built from.
    pub failures: Vec<PartialFailure>,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            permanent: false,
            failures: Vec::new(),
        }
    }

    /// Fold a non-empty list of failures into one error.
    pub fn from_failures(failures: &[PartialFailure]) -> Self {
        let code = failures
            .first()
            .map(|f| f.code.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let message = failures
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            code,
            message,
            permanent: failures.iter().any(|f| f.permanent),
            failures: failures.to_vec(),
        }
    }
}
