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

use crate::server::complete_response_error;
use bytes::Bytes;
use gax::error::Error;
use gax::error::response::ResponseError;
use http::{HeaderMap, HeaderName, HeaderValue, Request};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Additional configuration for a single-shot response.
///
/// # Example
/// ```
/// # use fake::responder::ResponseOptions;
/// use http::{header::ETAG, HeaderValue};
/// let options = ResponseOptions::default().set_header(ETAG, HeaderValue::from_static("abc123"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ResponseOptions {
    headers: HeaderMap,
}

impl ResponseOptions {
    /// Adds a header to the response.
    pub fn set_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds all the headers in `headers` to the response.
    pub fn set_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// The status code and headers of a synthesized response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResponseContent {
    /// The HTTP status code. Zero means the status was never set.
    pub status: u16,
    /// Additional headers for the response.
    pub headers: HeaderMap,
}

/// Represents the successful response of a single-shot operation.
///
/// The handlers in a fake server return a `Responder` to simulate a
/// successful response. The default value has no status code, and
/// dispatching it fails with a configuration error.
///
/// # Example
/// ```
/// # use fake::responder::Responder;
/// let mut responder = Responder::default();
/// responder.set_response(200, "w-001".to_string(), None);
/// assert_eq!(responder.response(), Some(&"w-001".to_string()));
/// assert_eq!(responder.response_content().status, 200);
/// ```
#[derive(Clone, Debug)]
pub struct Responder<T> {
    content: ResponseContent,
    value: Option<T>,
}

impl<T> std::default::Default for Responder<T> {
    fn default() -> Self {
        Self {
            content: ResponseContent::default(),
            value: None,
        }
    }
}

impl<T> Responder<T> {
    /// Sets the status code, the response value, and any additional headers.
    pub fn set_response(&mut self, status: u16, value: T, options: Option<ResponseOptions>) {
        self.content = ResponseContent {
            status,
            headers: options.map(|o| o.headers).unwrap_or_default(),
        };
        self.value = Some(value);
    }

    /// The response value, if set.
    pub fn response(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The status code and headers of the response.
    pub fn response_content(&self) -> ResponseContent {
        self.content.clone()
    }
}

/// A simulated error, before it is converted to an [Error].
#[derive(Debug)]
pub(crate) enum SimulatedError {
    Error(BoxError),
    Response(ResponseError),
}

impl SimulatedError {
    pub(crate) fn new<E: Into<BoxError>>(error: E) -> Self {
        let error = error.into();
        match error.downcast::<ResponseError>() {
            Ok(e) => Self::Response(*e),
            Err(e) => Self::Error(e),
        }
    }

    pub(crate) fn response(status: u16, code: &str) -> Self {
        Self::Response(ResponseError::new(status, code))
    }

    /// Converts the simulated error to a non-retriable [Error].
    ///
    /// Service errors are completed with the request and a synthesized raw
    /// response, using `headers` as additional response headers.
    pub(crate) fn into_error(self, request: &Request<Bytes>, headers: HeaderMap) -> Error {
        match self {
            Self::Error(e) => Error::non_retriable(e),
            Self::Response(e) => match complete_response_error(e, request, headers) {
                Ok(e) => Error::non_retriable(e),
                Err(e) => e,
            },
        }
    }
}

/// Represents the error response of an operation.
///
/// The handlers in a fake server return an `ErrorResponder` to simulate an
/// error. If both the `ErrorResponder` and the corresponding success
/// responder are set, the error is returned.
///
/// # Example
/// ```
/// # use fake::responder::ErrorResponder;
/// let mut errors = ErrorResponder::default();
/// errors.set_response_error(400, "FakeErrorCode");
/// assert!(errors.is_set());
/// ```
#[derive(Debug, Default)]
pub struct ErrorResponder {
    error: Option<SimulatedError>,
}

impl ErrorResponder {
    /// Sets an error, it is returned to the application as a non-retriable
    /// error.
    pub fn set_error<E: Into<BoxError>>(&mut self, error: E) {
        self.error = Some(SimulatedError::new(error));
    }

    /// Sets a service error with the given status code and error code.
    ///
    /// The application receives a [ResponseError], including a synthesized
    /// raw response.
    pub fn set_response_error(&mut self, status: u16, error_code: &str) {
        self.error = Some(SimulatedError::response(status, error_code));
    }

    /// Returns `true` if an error was configured.
    pub fn is_set(&self) -> bool {
        self.error.is_some()
    }

    /// Converts the configured error, if any, to an [Error].
    pub fn get_error(self, request: &Request<Bytes>) -> Option<Error> {
        self.error
            .map(|e| e.into_error(request, HeaderMap::new()))
    }
}
