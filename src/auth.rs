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

//! Authentication providers.
//!
//! Token acquisition is owned by the caller's identity provider; the client
//! only needs something that can produce an `Authorization` header value.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Produces the `Authorization` header for requests to the cluster.
pub trait AuthProvider: Send + Sync + fmt::Debug {
    fn get_auth_header(&self) -> Result<String>;
}

/// A pre-acquired bearer token.
#[derive(Clone)]
pub struct AccessToken {
    token: String,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for AccessToken {
    fn get_auth_header(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(Error::invalid_argument("Access token is empty"));
        }
        Ok(format!("Bearer {}", self.token))
    }
}

type TokenFn = dyn Fn() -> Result<String> + Send + Sync;

/// Calls back into the application for a fresh token on every request.
///
/// The callback is expected to cache and refresh tokens itself.
#[derive(Clone)]
pub struct TokenCallback {
    callback: Arc<TokenFn>,
}

impl TokenCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() -> Result<String> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl fmt::Debug for TokenCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCallback").finish_non_exhaustive()
    }
}

impl AuthProvider for TokenCallback {
    fn get_auth_header(&self) -> Result<String> {
        let token = (self.callback)()?;
        Ok(format!("Bearer {}", token))
    }
}
