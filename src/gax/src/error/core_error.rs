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

use super::response::ResponseError;
use http::HeaderMap;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The core error returned by all client libraries and fake transports.
///
/// The client libraries report errors from multiple sources. For example, the
/// service may return an error, the transport may be unable to complete the
/// request, the retry policy may be exhausted, or a fake transport may have
/// been configured to fail.
///
/// Most applications will just return the error or log it, without any further
/// action. However, some applications may need to interrogate the error
/// details. This type offers a series of predicates to determine the error
/// kind, and accessors to query the most common error details. Applications
/// can query the error [source][std::error::Error::source] for deeper
/// information, or use [as_inner][Error::as_inner] to find a specific error
/// type anywhere in the source chain.
///
/// # Example
/// ```
/// use gax::error::Error;
/// match example_function() {
///     Err(e) if e.is_non_retriable() => { println!("do not retry {e}"); },
///     Err(e) if e.is_timeout() => { println!("not enough time {e}"); },
///     Err(e) => { println!("some other error {e}"); },
///     Ok(_) => { println!("success, how boring"); },
/// }
///
/// fn example_function() -> Result<String, Error> {
///     // ... details omitted ...
///     # Err(Error::non_retriable("simulated failure"))
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

impl Error {
    /// Marks an error as one that must not be retried.
    ///
    /// The error formats exactly like `source`, and `source` remains reachable
    /// via [std::error::Error::source] and [as_inner][Error::as_inner]. Retry
    /// policies check [is_non_retriable][Error::is_non_retriable] before they
    /// look at any other detail of the error.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use gax::error::Error;
    /// let error = Error::non_retriable("fake-error");
    /// assert!(error.is_non_retriable());
    /// assert_eq!(error.to_string(), "fake-error");
    /// assert!(error.source().is_some());
    /// ```
    pub fn non_retriable<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::NonRetriable,
            source: Some(source.into()),
        }
    }

    /// The error is deterministic or terminal and retry policies must not
    /// retry it.
    ///
    /// All the errors produced by fake transports have this property. That
    /// includes simulated service errors, which would otherwise be retried
    /// when they carry a transient status code.
    pub fn is_non_retriable(&self) -> bool {
        matches!(self.kind, ErrorKind::NonRetriable)
    }

    /// Creates an error from a structured service error.
    ///
    /// # Example
    /// ```
    /// use gax::error::Error;
    /// use gax::error::response::ResponseError;
    /// let error = Error::response(ResponseError::new(404, "NotFound"));
    /// assert!(error.is_response());
    /// assert_eq!(error.http_status_code(), Some(404));
    /// ```
    pub fn response(error: ResponseError) -> Self {
        Self {
            kind: ErrorKind::Response,
            source: Some(error.into()),
        }
    }

    /// The service returned a non-2xx response.
    ///
    /// Use [response_error][Error::response_error] to query the error code
    /// and the raw response.
    pub fn is_response(&self) -> bool {
        matches!(self.kind, ErrorKind::Response)
    }

    /// The structured service error, if any, associated with this error.
    ///
    /// This searches the full source chain, so it also finds service errors
    /// wrapped by [non_retriable][Error::non_retriable].
    pub fn response_error(&self) -> Option<&ResponseError> {
        self.as_inner::<ResponseError>()
    }

    /// The HTTP status code, if any, associated with this error.
    ///
    /// # Example
    /// ```
    /// use gax::error::Error;
    /// use gax::error::response::ResponseError;
    /// let e = Error::non_retriable(ResponseError::new(409, "Conflict"));
    /// if let Some(code) = e.http_status_code() {
    ///     if code == 409 {
    ///         println!("the resource already exists, more details in {e}");
    ///     }
    /// }
    /// ```
    pub fn http_status_code(&self) -> Option<u16> {
        self.response_error().map(|e| e.status_code())
    }

    /// The headers, if any, of the raw response associated with this error.
    pub fn http_headers(&self) -> Option<&HeaderMap> {
        self.response_error()
            .and_then(|e| e.raw_response())
            .map(|r| r.headers())
    }

    /// Creates an error representing a timeout.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use gax::error::Error;
    /// let error = Error::timeout("simulated timeout");
    /// assert!(error.is_timeout());
    /// assert!(error.source().is_some());
    /// ```
    pub fn timeout<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Some(source.into()),
        }
    }

    /// The request could not be completed before its deadline.
    ///
    /// This is always a client-side generated error. Note that the request may
    /// or may not have started, and it may or may not complete in the service.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Creates an error representing an exhausted policy.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use gax::error::Error;
    /// let error = Error::exhausted("too many retry attempts");
    /// assert!(error.is_exhausted());
    /// assert!(error.source().is_some());
    /// ```
    pub fn exhausted<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Exhausted,
            source: Some(source.into()),
        }
    }

    /// The request could not complete before the retry policy expired.
    ///
    /// This is always a client-side generated error, but it may be the result
    /// of multiple errors received from the service.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::Exhausted)
    }

    /// Creates an error representing a deserialization problem.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use gax::error::Error;
    /// let error = Error::deser("simulated problem");
    /// assert!(error.is_deserialization());
    /// assert!(error.source().is_some());
    /// ```
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response could not be deserialized.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// Creates an error representing a serialization problem.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use gax::error::Error;
    /// let error = Error::ser("simulated problem");
    /// assert!(error.is_serialization());
    /// assert!(error.source().is_some());
    /// ```
    pub fn ser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            source: Some(source.into()),
        }
    }

    /// The request could not be serialized.
    ///
    /// This error is never transient: the serialization is deterministic, and
    /// will fail on future attempts with the same input data.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Serialization)
    }

    /// A problem in the transport layer without a full HTTP response.
    ///
    /// Examples include read or write problems, and broken connections.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Io,
            source: Some(source.into()),
        }
    }

    /// The transport could not complete the request.
    ///
    /// Most often, the solution is to use the right retry policy. This may
    /// involve changing your request to be idempotent, or configuring the
    /// policy to retry non-idempotent failures.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, ErrorKind::Io)
    }

    #[doc(hidden)]
    pub fn other<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Other,
            source: Some(source.into()),
        }
    }

    /// Finds the first error of type `T` in the source chain.
    ///
    /// # Example
    /// ```
    /// use gax::error::Error;
    /// use gax::error::response::ResponseError;
    /// let error = Error::non_retriable(ResponseError::new(400, "BlewUp"));
    /// let inner = error.as_inner::<ResponseError>();
    /// assert_eq!(inner.map(|e| e.error_code()), Some("BlewUp"));
    /// ```
    pub fn as_inner<T: StdError + 'static>(&self) -> Option<&T> {
        let mut error = self.source();
        while let Some(e) = error {
            if let Some(inner) = e.downcast_ref::<T>() {
                return Some(inner);
            }
            error = e.source();
        }
        None
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::NonRetriable, Some(e)) => write!(f, "{e}"),
            (ErrorKind::Response, Some(e)) => write!(f, "{e}"),
            (ErrorKind::Serialization, Some(e)) => write!(f, "cannot serialize the request {e}"),
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response {e}")
            }
            (ErrorKind::Timeout, Some(e)) => {
                write!(f, "the request exceeded the request deadline {e}")
            }
            (ErrorKind::Exhausted, Some(e)) => write!(f, "{e}"),
            (ErrorKind::Io, Some(e)) => write!(f, "the transport reports an error: {e}"),
            (ErrorKind::Other, Some(e)) => {
                write!(f, "an unclassified problem making a request: {e}")
            }
            (_, None) => unreachable!("no constructor allows this"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error))
    }
}

/// The type of error held by an [Error] instance.
#[derive(Debug)]
enum ErrorKind {
    NonRetriable,
    Response,
    Serialization,
    Deserialization,
    Timeout,
    Exhausted,
    Io,
    /// A uncategorized error.
    Other,
}
