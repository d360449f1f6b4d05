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

use bytes::Bytes;
use gax::Result;
use gax::error::Error;
use http::HeaderMap;
use std::time::Duration;

/// The header carrying the status of a long-running operation.
pub const STATUS_HEADER: &str = "fake-poller-status";

/// The status of a long-running operation, as reported by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationStatus {
    /// The operation has not completed.
    InProgress,
    /// The operation completed successfully.
    Succeeded,
    /// The operation completed with an error.
    Failed,
    /// The operation was canceled before it completed.
    Canceled,
}

impl OperationStatus {
    /// Returns `true` if the operation reached a final state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Returns the canonical name for the status, as used in headers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }

    /// Parses the status in `headers`, if present.
    ///
    /// Status names are case insensitive. Unknown values are reported as
    /// [InProgress][OperationStatus::InProgress], the service may add new
    /// intermediate states at any time.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(STATUS_HEADER)?.to_str().ok()?;
        Some(Self::from(value))
    }
}

impl From<&str> for OperationStatus {
    fn from(value: &str) -> Self {
        match value {
            v if v.eq_ignore_ascii_case("succeeded") => Self::Succeeded,
            v if v.eq_ignore_ascii_case("failed") => Self::Failed,
            v if v.eq_ignore_ascii_case("canceled") => Self::Canceled,
            _ => Self::InProgress,
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returns the delay requested by the `Retry-After` header, in seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// A typed snapshot of a long-running operation.
///
/// This is intended as an implementation detail of the generated clients.
/// Applications should have no need to create or use this struct.
#[doc(hidden)]
#[derive(Debug)]
pub struct Operation<R> {
    status: OperationStatus,
    retry_after: Option<Duration>,
    response: Option<R>,
}

impl<R> Operation<R> {
    pub fn new(status: OperationStatus) -> Self {
        Self {
            status,
            retry_after: None,
            response: None,
        }
    }

    pub fn set_retry_after<T: Into<Duration>>(mut self, v: T) -> Self {
        self.retry_after = Some(v.into());
        self
    }

    pub fn set_response(mut self, v: R) -> Self {
        self.response = Some(v);
        self
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub(crate) fn into_response(self) -> Option<R> {
        self.response
    }
}

impl<R> Operation<R>
where
    R: serde::de::DeserializeOwned,
{
    /// Converts a successful HTTP response into an operation snapshot.
    ///
    /// A response without a status header completed synchronously, and its
    /// payload is the result of the operation.
    pub fn from_response(response: http::Response<Bytes>) -> Result<Self> {
        let headers = response.headers();
        let status = OperationStatus::from_headers(headers).unwrap_or(OperationStatus::Succeeded);
        let retry_after = retry_after(headers);
        let response = match status {
            OperationStatus::Succeeded => {
                Some(serde_json::from_slice::<R>(response.body()).map_err(Error::deser)?)
            }
            _ => None,
        };
        Ok(Self {
            status,
            retry_after,
            response,
        })
    }
}
