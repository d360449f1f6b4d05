// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod core_error;
pub use core_error::*;

/// Structured errors returned by REST management services.
///
/// Services report failures with a non-2xx status code and an error code
/// header. The types in this module capture both, together with the raw
/// response, so applications (and tests) can inspect the typed fields and the
/// transport response.
///
/// # Examples
///
/// ```
/// # use gax::error;
/// use error::Error;
/// use error::response::ResponseError;
/// fn handle_error(e: Error) {
///     if let Some(service) = e.as_inner::<ResponseError>() {
///         println!("the service reported {} ({})", service.error_code(), service.status_code())
///     }
/// }
/// ```
pub mod response;
