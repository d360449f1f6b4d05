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

//! REST management client helpers.
//!
//! This crate contains the error type, the retry and backoff policies, and
//! the pagination helpers used by the generated REST management clients and by
//! the fake transports that stand in for the service in unit tests.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
///
/// This is the result type used by all functions wrapping RPCs.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The core error types used by generated clients and fake transports.
pub mod error;

/// Continuation-link based pagination.
pub mod paginator;

pub mod backoff_policy;
pub mod retry_policy;
pub mod retry_result;

/// The retry loop shared by the generated clients.
///
/// Not part of the public API, subject to change without notice.
#[doc(hidden)]
pub mod retry_loop_internal;
