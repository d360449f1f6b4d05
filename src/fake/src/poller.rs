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

use crate::errors::FakeError;
use crate::responder::{ResponseContent, SimulatedError};
use crate::server::{empty_response, marshal_response_as_json};
use bytes::Bytes;
use gax::Result;
use gax::error::response::ResponseError;
use http::header::RETRY_AFTER;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use lro::{OperationStatus, STATUS_HEADER};
use std::collections::VecDeque;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Additional configuration for a non-terminal response.
///
/// # Example
/// ```
/// # use fake::poller::NonTerminalResponseOptions;
/// use std::time::Duration;
/// let options = NonTerminalResponseOptions::default().set_retry_after(Duration::from_secs(5));
/// ```
#[derive(Clone, Debug, Default)]
pub struct NonTerminalResponseOptions {
    retry_after: Option<Duration>,
    headers: HeaderMap,
}

impl NonTerminalResponseOptions {
    /// Sets the delay requested via the `Retry-After` header.
    ///
    /// The header is expressed in seconds, delays shorter than a second are
    /// not included in the response.
    pub fn set_retry_after<T: Into<Duration>>(mut self, v: T) -> Self {
        self.retry_after = Some(v.into());
        self
    }

    /// Adds a header to the response.
    pub fn set_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Additional configuration for a terminal response.
#[derive(Clone, Debug, Default)]
pub struct TerminalResponseOptions {
    headers: HeaderMap,
}

impl TerminalResponseOptions {
    /// Adds a header to the response.
    pub fn set_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Debug)]
enum Step {
    InProgress(ResponseContent),
    Error(SimulatedError),
}

#[derive(Debug)]
enum Terminal<T> {
    Response { content: ResponseContent, result: T },
    Error(ResponseError),
}

/// Represents the sequence of responses of a long-running operation.
///
/// The sequence contains zero or more non-terminal steps, and then a single
/// terminal response. Non-terminal steps are either "in progress" responses,
/// or polling errors. The terminal response is either a success, including
/// the result of the operation, or a service error.
///
/// The first element is returned by the request that starts the operation,
/// the remaining elements are returned by the status polls.
///
/// # Example
/// ```
/// # use fake::poller::PollerResponder;
/// let mut poller = PollerResponder::default();
/// poller.add_non_terminal_response(201, None);
/// poller.add_polling_error("network glitch");
/// poller.set_terminal_response(200, "dodo".to_string(), None);
/// assert!(poller.more());
/// ```
#[derive(Debug)]
pub struct PollerResponder<T> {
    steps: VecDeque<Step>,
    terminal: Option<Terminal<T>>,
}

impl<T> std::default::Default for PollerResponder<T> {
    fn default() -> Self {
        Self {
            steps: VecDeque::new(),
            terminal: None,
        }
    }
}

impl<T> PollerResponder<T> {
    /// Adds a non-terminal response to the sequence.
    ///
    /// The response includes the [STATUS_HEADER] set to `InProgress`, and
    /// `Retry-After` if configured in `options`.
    pub fn add_non_terminal_response(
        &mut self,
        status: u16,
        options: Option<NonTerminalResponseOptions>,
    ) {
        let options = options.unwrap_or_default();
        let mut headers = options.headers;
        if let Some(secs) = options
            .retry_after
            .map(|d| d.as_secs())
            .filter(|s| *s > 0)
        {
            headers.insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        headers.insert(STATUS_HEADER, status_value(OperationStatus::InProgress));
        self.steps
            .push_back(Step::InProgress(ResponseContent { status, headers }));
    }

    /// Adds a polling error to the sequence.
    ///
    /// Polling errors do not complete the operation, the sequence continues
    /// after the error is returned.
    pub fn add_polling_error<E: Into<BoxError>>(&mut self, error: E) {
        self.steps
            .push_back(Step::Error(SimulatedError::new(error)));
    }

    /// Sets the successful terminal response, replacing any previous terminal
    /// response or error.
    pub fn set_terminal_response(
        &mut self,
        status: u16,
        result: T,
        options: Option<TerminalResponseOptions>,
    ) {
        let mut headers = options.map(|o| o.headers).unwrap_or_default();
        headers.insert(STATUS_HEADER, status_value(OperationStatus::Succeeded));
        self.terminal = Some(Terminal::Response {
            content: ResponseContent { status, headers },
            result,
        });
    }

    /// Sets the terminal error, replacing any previous terminal response or
    /// error.
    pub fn set_terminal_error(&mut self, status: u16, error_code: &str) {
        self.terminal = Some(Terminal::Error(ResponseError::new(status, error_code)));
    }

    /// Returns `true` if there are more responses in the sequence.
    ///
    /// Once the terminal response is returned this is always `false`.
    pub fn more(&self) -> bool {
        !self.steps.is_empty() || self.terminal.is_some()
    }

    /// Consumes the next element in the sequence and returns its response.
    pub fn next(&mut self, request: &Request<Bytes>) -> Result<Response<Bytes>>
    where
        T: serde::Serialize,
    {
        if let Some(step) = self.steps.pop_front() {
            return match step {
                Step::InProgress(content) => empty_response(&content, request),
                Step::Error(e) => Err(e.into_error(request, HeaderMap::new())),
            };
        }
        match self.terminal.take() {
            None => Err(FakeError::NoTerminalResponse.into()),
            Some(Terminal::Response { content, result }) => {
                marshal_response_as_json(&content, &result, request)
            }
            Some(Terminal::Error(e)) => {
                let mut headers = HeaderMap::new();
                headers.insert(STATUS_HEADER, status_value(OperationStatus::Failed));
                Err(SimulatedError::Response(e).into_error(request, headers))
            }
        }
    }
}

fn status_value(status: OperationStatus) -> HeaderValue {
    HeaderValue::from_static(status.name())
}
