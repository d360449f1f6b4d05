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

//! Routes requests to the handlers of a fake server.
//!
//! A generated fake server registers one operation per client method in a
//! [ServerTransport]. Each operation knows the path pattern for the method,
//! the status codes the method may return, and holds the handler provided by
//! the test. Multi-step operations ([PagerOperation] and [PollerOperation])
//! also track the responders of in-flight operations.

use crate::errors::FakeError;
use crate::pager::PagerResponder;
use crate::poller::PollerResponder;
use crate::responder::{ErrorResponder, Responder, ResponseContent};
use crate::server::{marshal_response_as_json, unmarshal_request_as_json};
use crate::tracker::Tracker;
use crate::transport::{ApiName, Transport};
use bytes::Bytes;
use gax::Result;
use http::{Request, Response};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The parameters of a request, as seen by a handler.
#[derive(Debug)]
pub struct Invocation<'a> {
    request: &'a Request<Bytes>,
    path: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl<'a> Invocation<'a> {
    /// The request that triggered this invocation.
    pub fn request(&self) -> &'a Request<Bytes> {
        self.request
    }

    /// The value of a path parameter, percent-decoded.
    ///
    /// Path parameters are the named capture groups in the path pattern for
    /// the method.
    pub fn path_param(&self, name: &str) -> Result<&str> {
        self.path
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| FakeError::MissingPathParameter(name.to_string()).into())
    }

    /// The value of a query parameter, percent-decoded.
    ///
    /// If the parameter appears more than once, the first value is returned.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Deserializes the JSON payload of the request.
    pub fn body<B>(&self) -> Result<B>
    where
        B: serde::de::DeserializeOwned,
    {
        unmarshal_request_as_json(self.request)
    }
}

/// An operation registered in a [ServerTransport].
pub trait Dispatch: std::fmt::Debug + Send + Sync {
    /// Handles one request for the operation.
    fn dispatch(&self, request: &Request<Bytes>) -> Result<Response<Bytes>>;
}

#[derive(Debug)]
struct Route {
    method: String,
    pattern: Regex,
    accepted: Vec<u16>,
}

impl Route {
    fn new(method: &str, pattern: &str, accepted: &[u16]) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| FakeError::Pattern {
            method: method.to_string(),
            source,
        })?;
        Ok(Self {
            method: method.to_string(),
            pattern,
            accepted: accepted.to_vec(),
        })
    }

    fn not_implemented(&self) -> FakeError {
        FakeError::NotImplemented(self.method.clone())
    }

    fn parse<'a>(&self, request: &'a Request<Bytes>) -> Result<Invocation<'a>> {
        let path = request.uri().path();
        let captures = self
            .pattern
            .captures(path)
            .ok_or_else(|| FakeError::PathMismatch(path.to_string()))?;
        let mut params = HashMap::new();
        for name in self.pattern.capture_names().flatten() {
            let Some(m) = captures.name(name) else {
                continue;
            };
            let value = percent_decode_str(m.as_str())
                .decode_utf8()
                .map_err(|source| FakeError::PathParameter {
                    name: name.to_string(),
                    source,
                })?;
            params.insert(name.to_string(), value.into_owned());
        }
        let mut query = HashMap::new();
        let raw = request.uri().query().unwrap_or_default();
        for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
            query.entry(k.into_owned()).or_insert_with(|| v.into_owned());
        }
        Ok(Invocation {
            request,
            path: params,
            query,
        })
    }

    fn check_status(&self, status: u16) -> Result<()> {
        if self.accepted.contains(&status) {
            return Ok(());
        }
        tracing::warn!(
            "{} returned status {status}, acceptable values are {:?}",
            self.method,
            self.accepted
        );
        let accepted = self
            .accepted
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(FakeError::UnexpectedStatus { status, accepted }.into())
    }
}

type Encoder<T> = fn(&ResponseContent, &T, &Request<Bytes>) -> Result<Response<Bytes>>;
type UnaryHandler<T> =
    Box<dyn Fn(&Invocation<'_>) -> Result<(Responder<T>, ErrorResponder)> + Send + Sync>;
type PagerHandler<T> = Box<dyn Fn(&Invocation<'_>) -> Result<PagerResponder<T>> + Send + Sync>;
type PollerHandler<T> =
    Box<dyn Fn(&Invocation<'_>) -> Result<(PollerResponder<T>, ErrorResponder)> + Send + Sync>;

/// A single-shot operation.
///
/// # Example
/// ```
/// # use fake::dispatcher::UnaryOperation;
/// # use fake::responder::{ErrorResponder, Responder};
/// let operation = UnaryOperation::<String>::new("Get", r"^/widgets/(?P<widgetName>[^/]+)$", &[200])?
///     .set_handler(|invocation| {
///         let mut responder = Responder::default();
///         responder.set_response(200, invocation.path_param("widgetName")?.to_string(), None);
///         Ok((responder, ErrorResponder::default()))
///     });
/// # gax::Result::<()>::Ok(())
/// ```
pub struct UnaryOperation<T> {
    route: Route,
    handler: Option<UnaryHandler<T>>,
    encoder: Encoder<T>,
}

impl<T> UnaryOperation<T>
where
    T: serde::Serialize,
{
    /// Creates a new operation.
    ///
    /// # Parameters
    /// * `method` - the name of the client method, used in error messages.
    /// * `pattern` - a regular expression matching the request path. Path
    ///   parameters are named capture groups.
    /// * `accepted` - the status codes the method may return.
    pub fn new(method: &str, pattern: &str, accepted: &[u16]) -> Result<Self> {
        Ok(Self {
            route: Route::new(method, pattern, accepted)?,
            handler: None,
            encoder: marshal_response_as_json::<T>,
        })
    }
}

impl<T> UnaryOperation<T> {
    /// Sets the handler provided by the test.
    pub fn set_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<(Responder<T>, ErrorResponder)> + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Changes how the response value is encoded, JSON is the default.
    pub fn set_encoder(mut self, encoder: Encoder<T>) -> Self {
        self.encoder = encoder;
        self
    }
}

impl<T> Dispatch for UnaryOperation<T> {
    fn dispatch(&self, request: &Request<Bytes>) -> Result<Response<Bytes>> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| self.route.not_implemented())?;
        let invocation = self.route.parse(request)?;
        let (responder, errors) = handler(&invocation)?;
        if let Some(e) = errors.get_error(request) {
            return Err(e);
        }
        let content = responder.response_content();
        let value = match responder.response() {
            Some(v) if content.status != 0 => v,
            _ => return Err(FakeError::MissingStatus.into()),
        };
        self.route.check_status(content.status)?;
        (self.encoder)(&content, value, request)
    }
}

impl<T> std::fmt::Debug for UnaryOperation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnaryOperation")
            .field("route", &self.route)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// A list operation, returning one page per request.
///
/// The handler is invoked on the first request. Its [PagerResponder] is
/// tracked until all the pages are returned, or until a page has an
/// unexpected status code.
pub struct PagerOperation<T> {
    route: Route,
    handler: Option<PagerHandler<T>>,
    injector: Option<fn(&mut T, String)>,
    tracker: Tracker<PagerResponder<T>>,
}

impl<T> PagerOperation<T> {
    /// Creates a new operation. See [UnaryOperation::new] for the parameters.
    pub fn new(method: &str, pattern: &str, accepted: &[u16]) -> Result<Self> {
        Ok(Self {
            route: Route::new(method, pattern, accepted)?,
            handler: None,
            injector: None,
            tracker: Tracker::default(),
        })
    }

    /// Sets the handler provided by the test.
    pub fn set_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<PagerResponder<T>> + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Sets the function used to store continuation links in each page.
    pub fn set_link_injector(mut self, injector: fn(&mut T, String)) -> Self {
        self.injector = Some(injector);
        self
    }
}

impl<T> Dispatch for PagerOperation<T>
where
    T: serde::Serialize + Send,
{
    fn dispatch(&self, request: &Request<Bytes>) -> Result<Response<Bytes>> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| self.route.not_implemented())?;
        let responder = self.tracker.get_or_try_insert_with(request, || {
            let invocation = self.route.parse(request)?;
            let mut pager = handler(&invocation)?;
            if let Some(injector) = self.injector {
                pager.inject_next_links(request, injector);
            }
            Ok::<_, gax::error::Error>(pager)
        })?;
        next_tracked(&self.route, &self.tracker, &responder, request, |p, r| {
            let result = p.next(r);
            (result, p.more())
        })
    }
}

impl<T> std::fmt::Debug for PagerOperation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagerOperation")
            .field("route", &self.route)
            .field("handler", &self.handler.is_some())
            .field("tracked", &self.tracker.len())
            .finish()
    }
}

/// A long-running operation.
///
/// The handler is invoked by the request that starts the operation. If the
/// handler returns an error, the error is returned immediately. Otherwise its
/// [PollerResponder] is tracked, and each request (the initial request and
/// the status polls) returns the next response in the sequence.
pub struct PollerOperation<T> {
    route: Route,
    handler: Option<PollerHandler<T>>,
    tracker: Tracker<PollerResponder<T>>,
}

impl<T> PollerOperation<T> {
    /// Creates a new operation. See [UnaryOperation::new] for the parameters.
    pub fn new(method: &str, pattern: &str, accepted: &[u16]) -> Result<Self> {
        Ok(Self {
            route: Route::new(method, pattern, accepted)?,
            handler: None,
            tracker: Tracker::default(),
        })
    }

    /// Sets the handler provided by the test.
    pub fn set_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<(PollerResponder<T>, ErrorResponder)>
            + Send
            + Sync
            + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }
}

impl<T> Dispatch for PollerOperation<T>
where
    T: serde::Serialize + Send,
{
    fn dispatch(&self, request: &Request<Bytes>) -> Result<Response<Bytes>> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| self.route.not_implemented())?;
        let responder = self.tracker.get_or_try_insert_with(request, || {
            let invocation = self.route.parse(request)?;
            let (poller, errors) = handler(&invocation)?;
            match errors.get_error(request) {
                Some(e) => Err(e),
                None => Ok(poller),
            }
        })?;
        next_tracked(&self.route, &self.tracker, &responder, request, |p, r| {
            let result = p.next(r);
            (result, p.more())
        })
    }
}

impl<T> std::fmt::Debug for PollerOperation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerOperation")
            .field("route", &self.route)
            .field("handler", &self.handler.is_some())
            .field("tracked", &self.tracker.len())
            .finish()
    }
}

/// Advances a tracked responder and validates the result.
///
/// The responder is removed from the tracker when it has no more responses,
/// or when the response has an unexpected status code.
fn next_tracked<R, F>(
    route: &Route,
    tracker: &Tracker<R>,
    responder: &Arc<Mutex<R>>,
    request: &Request<Bytes>,
    next: F,
) -> Result<Response<Bytes>>
where
    F: FnOnce(&mut R, &Request<Bytes>) -> (Result<Response<Bytes>>, bool),
{
    let (result, more) = {
        let mut guard = responder.lock().expect("responder lock is poisoned");
        next(&mut guard, request)
    };
    let result = result.and_then(|response| {
        route
            .check_status(response.status().as_u16())
            .inspect_err(|_| tracker.remove(request))
            .map(|_| response)
    });
    if !more {
        tracker.remove(request);
    }
    result
}

/// A fake transport routing requests to the operations of a fake server.
///
/// Requests are routed using the [ApiName] in the request extensions.
///
/// # Example
/// ```
/// # use fake::dispatcher::{ServerTransport, UnaryOperation};
/// # use fake::responder::{ErrorResponder, Responder};
/// # use fake::transport::{ApiName, Transport};
/// # use bytes::Bytes;
/// let transport = ServerTransport::new().register(
///     "WidgetsClient.Get",
///     UnaryOperation::<String>::new("Get", "^/widgets/(?P<name>[^/]+)$", &[200])?
///         .set_handler(|_| {
///             let mut responder = Responder::default();
///             responder.set_response(200, "w-001".to_string(), None);
///             Ok((responder, ErrorResponder::default()))
///         }),
/// );
/// let mut request = http::Request::builder()
///     .uri("https://management.example.com/widgets/w-001")
///     .body(Bytes::new())
///     .map_err(gax::error::Error::other)?;
/// request.extensions_mut().insert(ApiName::new("WidgetsClient.Get"));
/// let response = transport.send(request)?;
/// assert_eq!(response.status(), 200);
/// # gax::Result::<()>::Ok(())
/// ```
#[derive(Default)]
pub struct ServerTransport {
    operations: HashMap<String, Box<dyn Dispatch>>,
    interceptor: Option<Interceptor>,
}

type Interceptor =
    Box<dyn Fn(&Request<Bytes>) -> Option<Result<Response<Bytes>>> + Send + Sync + 'static>;

impl ServerTransport {
    /// Creates a transport without any operations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the operation for an API name, replacing any previous
    /// registration.
    pub fn register<D>(mut self, api_name: &str, operation: D) -> Self
    where
        D: Dispatch + 'static,
    {
        self.operations
            .insert(api_name.to_string(), Box::new(operation));
        self
    }

    /// Sets a function consulted before dispatching each request.
    ///
    /// If the interceptor returns `Some(result)`, the transport returns that
    /// result and the registered operation is not invoked. Requests without
    /// an [ApiName] are rejected before the interceptor runs.
    pub fn set_interceptor<F>(mut self, interceptor: F) -> Self
    where
        F: Fn(&Request<Bytes>) -> Option<Result<Response<Bytes>>> + Send + Sync + 'static,
    {
        self.interceptor = Some(Box::new(interceptor));
        self
    }
}

impl std::fmt::Debug for ServerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTransport")
            .field("operations", &self.operations)
            .field("interceptor", &self.interceptor.is_some())
            .finish()
    }
}

impl Transport for ServerTransport {
    fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let Some(name) = request.extensions().get::<ApiName>() else {
            return Err(FakeError::MissingApiName.into());
        };
        if let Some(result) = self.interceptor.as_ref().and_then(|i| i(&request)) {
            tracing::debug!("{name} intercepted: {} {}", request.method(), request.uri());
            return result;
        }
        let Some(operation) = self.operations.get(name.as_str()) else {
            tracing::warn!("no operation registered for {name}");
            return Err(FakeError::UnhandledApi(name.to_string()).into());
        };
        tracing::debug!("dispatching {name}: {} {}", request.method(), request.uri());
        let result = operation.dispatch(&request);
        if let Err(e) = &result {
            tracing::debug!("{name} returned an error: {e}");
        }
        result
    }
}
