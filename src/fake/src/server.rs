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

//! Helpers to synthesize responses and decode requests.
//!
//! The generated fake servers use these functions to convert the values
//! returned by the test handlers into HTTP responses, and to decode the
//! request parameters passed to the handlers.

use crate::errors::FakeError;
use crate::responder::ResponseContent;
use bytes::Bytes;
use gax::Result;
use gax::error::Error;
use gax::error::response::{ERROR_CODE_HEADER, ResponseError};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode, Version};

/// The path suffix used by clients to poll a fake long-running operation.
pub const POLLER_STATUS_SUFFIX: &str = "/get/fake/status";

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_TEXT: &str = "text/plain";
const CONTENT_TYPE_BYTES: &str = "application/octet-stream";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Creates a response with the status, headers, and body provided.
///
/// The response always uses HTTP/1.1. The `Content-Type` and
/// `Content-Length` headers are only set when the body is not empty. Headers
/// in `content` take precedence over these defaults.
pub fn new_response(
    content: &ResponseContent,
    body: Bytes,
    _request: &Request<Bytes>,
) -> Result<Response<Bytes>> {
    let status = status_code(content.status)?;
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    *response.version_mut() = Version::HTTP_11;
    if !body.is_empty() {
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    }
    for (name, value) in content.headers.iter() {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    *response.body_mut() = body;
    Ok(response)
}

/// Serializes `value` as the JSON payload of a new response.
pub fn marshal_response_as_json<T>(
    content: &ResponseContent,
    value: &T,
    request: &Request<Bytes>,
) -> Result<Response<Bytes>>
where
    T: serde::Serialize,
{
    let body = serde_json::to_vec(value).map_err(FakeError::ResponseBody)?;
    new_response(content, Bytes::from(body), request)
}

/// Uses `value` as the binary payload of a new response.
pub fn marshal_response_as_bytes<T>(
    content: &ResponseContent,
    value: &T,
    request: &Request<Bytes>,
) -> Result<Response<Bytes>>
where
    T: AsRef<[u8]>,
{
    let body = Bytes::copy_from_slice(value.as_ref());
    let empty = body.is_empty();
    let mut response = new_response(content, body, request)?;
    if !empty && !content.headers.contains_key(CONTENT_TYPE) {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_BYTES));
    }
    Ok(response)
}

/// Uses `value` as the text payload of a new response.
pub fn marshal_response_as_text<T>(
    content: &ResponseContent,
    value: &T,
    request: &Request<Bytes>,
) -> Result<Response<Bytes>>
where
    T: AsRef<str>,
{
    let body = Bytes::copy_from_slice(value.as_ref().as_bytes());
    let empty = body.is_empty();
    let mut response = new_response(content, body, request)?;
    if !empty && !content.headers.contains_key(CONTENT_TYPE) {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_TEXT));
    }
    Ok(response)
}

/// Creates a response without a payload.
pub fn empty_response(
    content: &ResponseContent,
    request: &Request<Bytes>,
) -> Result<Response<Bytes>> {
    new_response(content, Bytes::new(), request)
}

/// Deserializes the JSON payload of a request.
pub fn unmarshal_request_as_json<T>(request: &Request<Bytes>) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::from_slice::<T>(request.body()).map_err(FakeError::RequestBody)?;
    Ok(value)
}

/// Returns the binary payload of a request.
pub fn unmarshal_request_as_bytes(request: &Request<Bytes>) -> Result<Bytes> {
    Ok(request.body().clone())
}

/// Returns the text payload of a request.
pub fn unmarshal_request_as_text(request: &Request<Bytes>) -> Result<String> {
    let text = String::from_utf8(request.body().to_vec()).map_err(FakeError::RequestText)?;
    Ok(text)
}

/// Removes the pager and poller suffixes from a request path.
///
/// Continuation links append `/page_{n}` to the path of the original request,
/// and status polls append `/get/fake/status`. Removing these suffixes yields
/// the same path for all the requests of one multi-step operation.
///
/// # Example
/// ```
/// # use fake::server::sanitize_pager_poller_path;
/// assert_eq!(sanitize_pager_poller_path("/widgets/page_2"), "/widgets");
/// assert_eq!(sanitize_pager_poller_path("/widgets/w-001/get/fake/status"), "/widgets/w-001");
/// assert_eq!(sanitize_pager_poller_path("/widgets/page_two"), "/widgets/page_two");
/// ```
pub fn sanitize_pager_poller_path(path: &str) -> &str {
    if let Some(stripped) = path.strip_suffix(POLLER_STATUS_SUFFIX) {
        return stripped;
    }
    match path.rsplit_once("/page_") {
        Some((prefix, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => prefix,
        _ => path,
    }
}

/// Converts empty query parameter values to `None`.
pub fn get_optional(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parses an optional query parameter value.
///
/// Missing or empty values are returned as `None`.
///
/// # Example
/// ```
/// # use fake::server::parse_optional;
/// let top = parse_optional(Some("10"), str::parse::<i32>)?;
/// assert_eq!(top, Some(10));
/// let top = parse_optional(Some(""), str::parse::<i32>)?;
/// assert_eq!(top, None);
/// # gax::Result::<()>::Ok(())
/// ```
pub fn parse_optional<T, E, F>(value: Option<&str>, parse: F) -> Result<Option<T>>
where
    F: FnOnce(&str) -> std::result::Result<T, E>,
    E: Into<BoxError>,
{
    match get_optional(value) {
        None => Ok(None),
        Some(v) => parse(v).map(Some).map_err(Error::non_retriable),
    }
}

pub(crate) fn status_code(status: u16) -> Result<StatusCode> {
    if status == 0 {
        return Err(FakeError::MissingStatus.into());
    }
    StatusCode::from_u16(status).map_err(|_| FakeError::InvalidStatus(status).into())
}

/// Completes a simulated service error with the request and a raw response.
///
/// Errors created by the test only contain the status code and the error
/// code. The raw response is synthesized from these values, with any
/// additional `headers`, so the application receives an error that looks like
/// the errors returned by the service. Status codes and error codes that
/// cannot be represented in a response are reported as [FakeError].
pub(crate) fn complete_response_error(
    error: ResponseError,
    request: &Request<Bytes>,
    headers: HeaderMap,
) -> Result<ResponseError> {
    let error = match error.method() {
        Some(_) => error,
        None => error.set_request(request.method().clone(), request.uri().clone()),
    };
    if error.raw_response().is_some() {
        return Ok(error);
    }
    let status = status_code(error.status_code())?;
    let code = HeaderValue::from_str(error.error_code())
        .map_err(|_| FakeError::InvalidErrorCode(error.error_code().to_string()))?;
    let mut raw = Response::new(Bytes::new());
    *raw.status_mut() = status;
    *raw.version_mut() = Version::HTTP_11;
    raw.headers_mut().insert(ERROR_CODE_HEADER, code);
    raw.headers_mut().extend(headers);
    Ok(error.set_raw_response(raw))
}
