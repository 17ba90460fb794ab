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

//! Wire types for the Kusto REST API.
//!
//! - `v2`: query endpoint frames
//! - `v1`: management endpoint tables
//! - `request`: request body and client request properties

pub mod request;
pub mod v1;
pub mod v2;

pub use request::{ClientRequestProperties, QueryRequestBody};
pub use v1::{V1Column, V1Response, V1Table};
pub use v2::{
    ColumnV2, DataSetCompletion, DataTable, Frame, OneApiError, OneApiErrorDetail, TableKind,
};
