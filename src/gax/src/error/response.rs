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
use http::{Method, Uri};

/// The header used by services to report the error code of a failed request.
pub const ERROR_CODE_HEADER: &str = "x-ms-error-code";

const SEPARATOR: &str =
    "--------------------------------------------------------------------------------";

/// An error describing a non-2xx response from a REST management service.
///
/// The error carries the service-specific error code, the HTTP status code,
/// and, when available, the request that failed and the raw response.
///
/// # Example
/// ```
/// # use gax::error::response::ResponseError;
/// let error = ResponseError::new(400, "InvalidResourceName");
/// assert_eq!(error.status_code(), 400);
/// assert_eq!(error.error_code(), "InvalidResourceName");
/// assert!(error.raw_response().is_none());
/// ```
#[derive(Debug)]
pub struct ResponseError {
    error_code: String,
    status_code: u16,
    method: Option<Method>,
    uri: Option<Uri>,
    raw_response: Option<http::Response<Bytes>>,
}

impl ResponseError {
    /// Creates a new error with the given status code and error code.
    pub fn new<C: Into<String>>(status_code: u16, error_code: C) -> Self {
        Self {
            error_code: error_code.into(),
            status_code,
            method: None,
            uri: None,
            raw_response: None,
        }
    }

    /// Creates an error from a non-2xx response.
    ///
    /// The error code is taken from the [ERROR_CODE_HEADER] header. If the
    /// header is missing the function looks for `{"error": {"code": ...}}` in
    /// the payload.
    pub fn from_response(method: Method, uri: Uri, response: http::Response<Bytes>) -> Self {
        let error_code = response
            .headers()
            .get(ERROR_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| error_code_from_payload(response.body()))
            .unwrap_or_default();
        Self {
            error_code,
            status_code: response.status().as_u16(),
            method: Some(method),
            uri: Some(uri),
            raw_response: Some(response),
        }
    }

    /// Sets the request that produced this error.
    pub fn set_request(mut self, method: Method, uri: Uri) -> Self {
        self.method = Some(method);
        self.uri = Some(uri);
        self
    }

    /// Sets the raw response.
    pub fn set_raw_response(mut self, response: http::Response<Bytes>) -> Self {
        self.raw_response = Some(response);
        self
    }

    /// The error code reported by the service, possibly empty.
    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    /// The HTTP status code of the response.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The method of the request that failed, if known.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// The URI of the request that failed, if known.
    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    /// The raw response, if any.
    pub fn raw_response(&self) -> Option<&http::Response<Bytes>> {
        self.raw_response.as_ref()
    }
}

fn error_code_from_payload(payload: &Bytes) -> Option<String> {
    let value = serde_json::from_slice::<serde_json::Value>(payload).ok()?;
    let code = value.get("error")?.get("code")?;
    code.as_str().map(str::to_string)
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(method), Some(uri)) = (&self.method, &self.uri) {
            writeln!(f, "{method} {uri}")?;
        }
        writeln!(f, "{SEPARATOR}")?;
        match self.raw_response.as_ref().map(|r| r.status()) {
            Some(status) => writeln!(f, "RESPONSE {}: {status}", self.status_code)?,
            None => writeln!(f, "RESPONSE {}", self.status_code)?,
        }
        if self.error_code.is_empty() {
            writeln!(f, "ERROR CODE UNAVAILABLE")?;
        } else {
            writeln!(f, "ERROR CODE: {}", self.error_code)?;
        }
        writeln!(f, "{SEPARATOR}")?;
        match self.raw_response.as_ref().map(|r| r.body()) {
            Some(body) if !body.is_empty() => {
                match serde_json::from_slice::<serde_json::Value>(body) {
                    Ok(v) => match serde_json::to_string_pretty(&v) {
                        Ok(pretty) => writeln!(f, "{pretty}")?,
                        Err(_) => writeln!(f, "{v}")?,
                    },
                    Err(_) => writeln!(f, "{}", String::from_utf8_lossy(body))?,
                }
            }
            _ => writeln!(f, "Response contained no body")?,
        }
        write!(f, "{SEPARATOR}")
    }
}

impl std::error::Error for ResponseError {}
