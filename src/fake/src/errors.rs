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

use gax::error::Error;

/// Configuration and usage errors detected by the fake transports.
///
/// These errors indicate a problem with the test setup, for example, a
/// handler that was never implemented or a responder without a status code.
/// They are always reported as [non-retriable][Error::is_non_retriable].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FakeError {
    #[error("unable to dispatch request, missing value for the API name")]
    MissingApiName,
    #[error("unhandled API {0}")]
    UnhandledApi(String),
    #[error("malformed API name {0}")]
    MalformedApiName(String),
    #[error("unhandled client {0}")]
    UnhandledClient(String),
    #[error("fake for method {0} not implemented")]
    NotImplemented(String),
    #[error("failed to parse path {0}")]
    PathMismatch(String),
    #[error("cannot decode path parameter {name}: {source}")]
    PathParameter {
        name: String,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("missing path parameter {0}")]
    MissingPathParameter(String),
    #[error("unexpected status code {status}. acceptable values are {accepted}")]
    UnexpectedStatus { status: u16, accepted: String },
    #[error("no HTTP status code was specified")]
    MissingStatus,
    #[error("invalid HTTP status code {0}")]
    InvalidStatus(u16),
    #[error("invalid error code {0:?}")]
    InvalidErrorCode(String),
    #[error("pager has no pages")]
    NoPages,
    #[error("no terminal response")]
    NoTerminalResponse,
    #[error("cannot decode the request body: {0}")]
    RequestBody(#[source] serde_json::Error),
    #[error("the request body is not valid UTF-8: {0}")]
    RequestText(#[source] std::string::FromUtf8Error),
    #[error("cannot encode the response body: {0}")]
    ResponseBody(#[source] serde_json::Error),
    #[error("invalid pattern for method {method}: {source}")]
    Pattern {
        method: String,
        #[source]
        source: regex::Error,
    },
}

impl From<FakeError> for Error {
    fn from(value: FakeError) -> Self {
        Error::non_retriable(value)
    }
}
