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
use crate::server::marshal_response_as_json;
use bytes::Bytes;
use gax::Result;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use std::collections::VecDeque;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Additional configuration for a page.
#[derive(Clone, Debug, Default)]
pub struct PageOptions {
    headers: HeaderMap,
}

impl PageOptions {
    /// Adds a header to the page response.
    pub fn set_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Debug)]
enum Page<T> {
    Entry { content: ResponseContent, entry: T },
    Error(SimulatedError),
}

/// Represents the sequence of responses of a list operation.
///
/// The handlers in a fake server return a `PagerResponder` to simulate a
/// list operation. Each call to the list operation (and its continuation
/// links) consumes one element of the sequence, in insertion order. Pages
/// and errors can be freely interleaved.
///
/// # Example
/// ```
/// # use fake::pager::PagerResponder;
/// let mut pager = PagerResponder::default();
/// pager.add_page(200, vec!["a", "b"], None);
/// pager.add_error("network glitch");
/// pager.add_page(200, vec!["c"], None);
/// pager.add_response_error(400, "BlewUp");
/// assert!(pager.more());
/// ```
#[derive(Debug)]
pub struct PagerResponder<T> {
    pages: VecDeque<Page<T>>,
}

impl<T> std::default::Default for PagerResponder<T> {
    fn default() -> Self {
        Self {
            pages: VecDeque::new(),
        }
    }
}

impl<T> PagerResponder<T> {
    /// Adds a page to the sequence.
    pub fn add_page(&mut self, status: u16, page: T, options: Option<PageOptions>) {
        let content = ResponseContent {
            status,
            headers: options.map(|o| o.headers).unwrap_or_default(),
        };
        self.pages.push_back(Page::Entry {
            content,
            entry: page,
        });
    }

    /// Adds an error to the sequence.
    ///
    /// The application receives the error as a non-retriable error, and the
    /// sequence continues with the next element.
    pub fn add_error<E: Into<BoxError>>(&mut self, error: E) {
        self.pages
            .push_back(Page::Error(SimulatedError::new(error)));
    }

    /// Adds a service error to the sequence.
    pub fn add_response_error(&mut self, status: u16, error_code: &str) {
        self.pages
            .push_back(Page::Error(SimulatedError::response(status, error_code)));
    }

    /// Returns `true` if there are more elements in the sequence.
    pub fn more(&self) -> bool {
        !self.pages.is_empty()
    }

    /// Sets the continuation link in all the pages, except the last one.
    ///
    /// The link for the n-th page (counting from 1, errors are not counted)
    /// is `{scheme}://{host}{path}/page_{n}`, using the values from `request`.
    /// The last page does not get a link, errors after the last page do not
    /// change that.
    pub fn inject_next_links<F>(&mut self, request: &Request<Bytes>, mut injector: F)
    where
        F: FnMut(&mut T, String),
    {
        let uri = request.uri();
        let scheme = uri.scheme_str().unwrap_or("https");
        let host = uri.authority().map(|a| a.as_str()).unwrap_or_default();
        let path = uri.path();
        let last = self
            .pages
            .iter()
            .rposition(|p| matches!(p, Page::Entry { .. }));
        let Some(last) = last else {
            return;
        };
        let entries = self
            .pages
            .iter_mut()
            .take(last)
            .filter_map(|p| match p {
                Page::Entry { entry, .. } => Some(entry),
                Page::Error(_) => None,
            });
        for (n, entry) in entries.enumerate() {
            injector(entry, format!("{scheme}://{host}{path}/page_{}", n + 1));
        }
    }

    /// Consumes the next element in the sequence and returns its response.
    ///
    /// Returns an error if the sequence is empty, or if the next element is
    /// an error. All errors are non-retriable.
    pub fn next(&mut self, request: &Request<Bytes>) -> Result<Response<Bytes>>
    where
        T: serde::Serialize,
    {
        match self.pages.pop_front() {
            None => Err(FakeError::NoPages.into()),
            Some(Page::Error(e)) => Err(e.into_error(request, HeaderMap::new())),
            Some(Page::Entry { content, entry }) => {
                marshal_response_as_json(&content, &entry, request)
            }
        }
    }
}
