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

use crate::Result;
use std::future::Future;
use std::pin::Pin;

/// Describes a page returned by a list operation.
///
/// REST management services return the absolute URL of the next page in the
/// response, or no URL at all on the last page.
pub trait PageableResponse {
    /// The continuation link, `None` or empty on the last page.
    fn next_link(&self) -> Option<String>;
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;
type Execute<T> = Box<dyn Fn(Option<String>) -> BoxFuture<T> + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
enum Cursor {
    First,
    Link(String),
    Done,
}

/// Iterates over the pages of a list operation.
///
/// The paginator calls `execute` with `None` for the first page, and with the
/// continuation link of the previous page after that. If a request fails the
/// cursor does not move, the next call to [next_page][Paginator::next_page]
/// repeats the same request.
///
/// # Example
/// ```
/// # use gax::paginator::*;
/// #[derive(Debug)]
/// struct Page { items: Vec<String>, next_link: Option<String> }
/// impl PageableResponse for Page {
///     fn next_link(&self) -> Option<String> { self.next_link.clone() }
/// }
///
/// async fn count_items() -> gax::Result<usize> {
///     let mut pages = Paginator::new(|link: Option<String>| async move {
///         let next_link = match link {
///             None => Some("https://example.com/items/page_1".to_string()),
///             Some(_) => None,
///         };
///         Ok(Page { items: vec!["a".to_string()], next_link })
///     });
///     let mut count = 0;
///     while let Some(page) = pages.next_page().await {
///         count += page?.items.len();
///     }
///     Ok(count)
/// }
/// ```
pub struct Paginator<T> {
    execute: Execute<T>,
    cursor: Cursor,
}

impl<T> Paginator<T>
where
    T: PageableResponse + Send + 'static,
{
    /// Creates a new paginator given a function to fetch each page.
    pub fn new<F, Fut>(execute: F) -> Self
    where
        F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let execute: Execute<T> = Box::new(move |link| Box::pin(execute(link)));
        Self {
            execute,
            cursor: Cursor::First,
        }
    }

    /// Returns `true` if there are more pages to fetch.
    pub fn more(&self) -> bool {
        self.cursor != Cursor::Done
    }

    /// Fetches the next page, `None` once all pages have been returned.
    pub async fn next_page(&mut self) -> Option<Result<T>> {
        let link = match &self.cursor {
            Cursor::Done => return None,
            Cursor::First => None,
            Cursor::Link(link) => Some(link.clone()),
        };
        let page = match (self.execute)(link).await {
            Ok(page) => page,
            Err(e) => return Some(Err(e)),
        };
        self.cursor = match page.next_link() {
            Some(link) if !link.is_empty() => Cursor::Link(link),
            _ => Cursor::Done,
        };
        Some(Ok(page))
    }

    /// Converts the paginator into a [futures::Stream].
    ///
    /// The stream ends after the last page, or after the first error.
    #[cfg(feature = "unstable-stream")]
    pub fn into_stream(self) -> impl futures::Stream<Item = Result<T>> + Unpin {
        use futures::stream::unfold;
        Box::pin(unfold(Some(self), |state| async move {
            let mut paginator = state?;
            match paginator.next_page().await? {
                Ok(page) => Some((Ok(page), Some(paginator))),
                Err(e) => Some((Err(e), None)),
            }
        }))
    }
}

impl<T> std::fmt::Debug for Paginator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("cursor", &self.cursor)
            .finish()
    }
}
