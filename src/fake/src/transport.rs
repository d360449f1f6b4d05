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
use std::sync::Arc;

/// Sends requests on behalf of a REST management client.
///
/// The generated clients send every request through an implementation of
/// this trait. Tests replace the network transport with one of the fakes in
/// this crate, such as [ServerTransport][crate::dispatcher::ServerTransport].
///
/// A transport returns `Ok` for any response received from the service,
/// including non-2xx responses. Errors synthesized by a fake transport are
/// returned as [non-retriable][gax::error::Error::is_non_retriable] errors.
pub trait Transport: std::fmt::Debug + Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.as_ref().send(request)
    }
}

/// The logical name of the operation a request belongs to.
///
/// Generated clients insert this value in the [request extensions] of every
/// request. Its format is `{Client}.{Method}`, for example
/// `WidgetsClient.BeginCreate`. The fake transports route requests using
/// this name.
///
/// # Example
/// ```
/// # use fake::transport::ApiName;
/// let name = ApiName::new("WidgetsClient.Get");
/// assert_eq!(name.client(), Some("WidgetsClient"));
/// assert_eq!(name.method(), Some("Get"));
/// ```
///
/// [request extensions]: http::Request::extensions
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiName(String);

impl ApiName {
    /// Creates a new API name.
    pub fn new<T: Into<String>>(value: T) -> Self {
        Self(value.into())
    }

    /// The full name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The client portion of the name, `None` if the name is malformed.
    pub fn client(&self) -> Option<&str> {
        self.0.split_once('.').map(|(c, _)| c)
    }

    /// The method portion of the name, `None` if the name is malformed.
    pub fn method(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, m)| m)
    }
}

impl std::fmt::Display for ApiName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overrides the key used to correlate the requests of a multi-step operation.
///
/// By default the fake transports correlate the requests for a pager, or a
/// long-running operation, using the request path (without the page or
/// status suffixes). Clients that resume an operation from a token can set
/// this extension to reattach to the original sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Creates a new key.
    pub fn new<T: Into<String>>(value: T) -> Self {
        Self(value.into())
    }

    /// The key value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
