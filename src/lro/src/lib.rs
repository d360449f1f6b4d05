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

//! Types and functions to make LROs easier to use and to require less boilerplate.
//!
//! REST management services start a long-running operation (LRO) with a
//! regular request. The response, and every subsequent poll, reports the
//! status of the operation in the [STATUS_HEADER] header. Once the status is
//! terminal the payload of the response contains the result.

use gax::Result;
use gax::error::Error;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

mod status;
pub use status::{OperationStatus, STATUS_HEADER, retry_after};
#[doc(hidden)]
pub use status::Operation;

/// The polling frequency used when the service does not send `Retry-After`.
pub const DEFAULT_FREQUENCY: Duration = Duration::from_secs(30);

/// The result of polling a Long-Running Operation (LRO).
///
/// # Parameters
/// * `R` - the response type. This is the type returned when the LRO completes
///   successfully.
#[derive(Debug)]
pub enum PollingResult<R> {
    /// The operation is still in progress.
    InProgress,
    /// The operation completed. This includes the result.
    Completed(Result<R>),
    /// An error trying to poll the LRO.
    ///
    /// Not all errors indicate that the operation failed. For example, this
    /// may fail because the service was temporarily unavailable. Such errors
    /// may disappear in the next polling attempt.
    PollingError(Error),
}

/// The trait implemented by LRO helpers.
///
/// # Parameters
/// * `R` - the response type, that is, the type of response included when the
///   long-running operation completes successfully.
pub trait Poller<R>: Send {
    /// Query the current status of the long-running operation.
    ///
    /// Returns `None` once the operation has completed, and the result was
    /// returned by a previous call.
    fn poll(&mut self) -> impl Future<Output = Option<PollingResult<R>>> + Send;

    /// Poll the long-running operation until it completes.
    ///
    /// Between polls the function waits for the delay requested by the
    /// service in the `Retry-After` header, or the polling frequency if the
    /// service did not request a delay. Polling errors stop the loop.
    fn until_done(self) -> impl Future<Output = Result<R>> + Send;

    /// Convert a poller to a [futures::Stream].
    #[cfg(feature = "unstable-stream")]
    fn into_stream(self) -> impl futures::Stream<Item = PollingResult<R>> + Unpin;
}

/// Creates a new `impl Poller<R>` from the closures created by the generator.
///
/// This is intended as an implementation detail of the generated clients.
/// Applications should have no need to create or use this function.
///
/// # Parameters
/// * `start` - starts the operation. All the request parameters, and the
///   retry options, are captured by this closure.
/// * `query` - queries the status of the operation created by `start`.
/// * `frequency` - the delay between polls when the service does not send
///   `Retry-After`. A zero frequency selects [DEFAULT_FREQUENCY].
#[doc(hidden)]
pub fn new_poller<R, S, SF, Q, QF>(start: S, query: Q, frequency: Duration) -> impl Poller<R>
where
    R: Send + 'static,
    S: FnOnce() -> SF + Send + Sync,
    SF: Future<Output = Result<Operation<R>>> + Send + 'static,
    Q: Fn() -> QF + Send + Sync + Clone,
    QF: Future<Output = Result<Operation<R>>> + Send + 'static,
{
    PollerImpl::new(start, query, frequency)
}

#[derive(Debug, PartialEq)]
enum State {
    NotStarted,
    Polling(Option<Duration>),
    Done,
}

/// An implementation of `Poller` based on closures.
///
/// # Parameters
/// * `S` - the start closure.
/// * `SF` - the type of future returned by `S`.
/// * `Q` - the query closure. Queries the status of the LRO created by `start`.
/// * `QF` - the type of future returned by `Q`.
struct PollerImpl<R, S, SF, Q, QF>
where
    S: FnOnce() -> SF + Send + Sync,
    SF: Future<Output = Result<Operation<R>>> + Send + 'static,
    Q: Fn() -> QF + Send + Sync + Clone,
    QF: Future<Output = Result<Operation<R>>> + Send + 'static,
{
    start: Option<S>,
    query: Q,
    frequency: Duration,
    state: State,
    _phantom: PhantomData<fn() -> (R, SF, QF)>,
}

impl<R, S, SF, Q, QF> PollerImpl<R, S, SF, Q, QF>
where
    S: FnOnce() -> SF + Send + Sync,
    SF: Future<Output = Result<Operation<R>>> + Send + 'static,
    Q: Fn() -> QF + Send + Sync + Clone,
    QF: Future<Output = Result<Operation<R>>> + Send + 'static,
{
    fn new(start: S, query: Q, frequency: Duration) -> Self {
        let frequency = if frequency.is_zero() {
            DEFAULT_FREQUENCY
        } else {
            frequency
        };
        Self {
            start: Some(start),
            query,
            frequency,
            state: State::NotStarted,
            _phantom: PhantomData,
        }
    }

    fn delay(&self) -> Duration {
        match &self.state {
            State::Polling(Some(d)) => *d,
            _ => self.frequency,
        }
    }

    fn handle_operation(&mut self, op: Operation<R>) -> PollingResult<R> {
        match op.status() {
            OperationStatus::InProgress => {
                self.state = State::Polling(op.retry_after());
                PollingResult::InProgress
            }
            OperationStatus::Succeeded => {
                self.state = State::Done;
                let result = op
                    .into_response()
                    .ok_or_else(|| Error::deser("the operation succeeded without a result"));
                PollingResult::Completed(result)
            }
            status => {
                self.state = State::Done;
                PollingResult::Completed(Err(Error::other(format!(
                    "the operation completed with status {status}"
                ))))
            }
        }
    }

    fn handle_query_error(&mut self, error: Error) -> PollingResult<R> {
        let status = error.http_headers().and_then(OperationStatus::from_headers);
        if status.is_some_and(|s| s.is_terminal()) {
            self.state = State::Done;
            return PollingResult::Completed(Err(error));
        }
        tracing::debug!("error polling long-running operation: {error}");
        PollingResult::PollingError(error)
    }
}

impl<R, S, SF, Q, QF> Poller<R> for PollerImpl<R, S, SF, Q, QF>
where
    R: Send + 'static,
    S: FnOnce() -> SF + Send + Sync,
    SF: Future<Output = Result<Operation<R>>> + Send + 'static,
    Q: Fn() -> QF + Send + Sync + Clone,
    QF: Future<Output = Result<Operation<R>>> + Send + 'static,
{
    async fn poll(&mut self) -> Option<PollingResult<R>> {
        match self.state {
            State::Done => None,
            State::NotStarted => {
                let start = match self.start.take() {
                    Some(s) => s,
                    None => {
                        self.state = State::Done;
                        return None;
                    }
                };
                let result = match start().await {
                    Ok(op) => self.handle_operation(op),
                    Err(e) => {
                        self.state = State::Done;
                        PollingResult::Completed(Err(e))
                    }
                };
                Some(result)
            }
            State::Polling(_) => {
                let query = self.query.clone();
                let result = match query().await {
                    Ok(op) => self.handle_operation(op),
                    Err(e) => self.handle_query_error(e),
                };
                Some(result)
            }
        }
    }

    async fn until_done(mut self) -> Result<R> {
        loop {
            match self.poll().await {
                None => {
                    return Err(Error::other(
                        "the poller completed without returning a result",
                    ));
                }
                Some(PollingResult::Completed(r)) => return r,
                Some(PollingResult::PollingError(e)) => return Err(e),
                Some(PollingResult::InProgress) => {
                    let delay = self.delay();
                    tracing::debug!("operation in progress, polling again in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    #[cfg(feature = "unstable-stream")]
    fn into_stream(self) -> impl futures::Stream<Item = PollingResult<R>> + Unpin {
        use futures::stream::unfold;
        Box::pin(unfold(Some(self), move |state| async move {
            let mut poller = state?;
            let result = poller.poll().await?;
            Some((result, Some(poller)))
        }))
    }
}
