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

//! Defines traits for retry policies and some common implementations.
//!
//! The client libraries automatically retry requests when they fail due to
//! transient errors and the request is idempotent, that is, it is safe to
//! perform the request more than once.
//!
//! All policies in this module treat [non-retriable][Error::is_non_retriable]
//! errors as permanent. Fake transports rely on this: every failure they
//! synthesize is non-retriable, so a simulated `503` is observed by the code
//! under test exactly once.

use crate::error::Error;
use crate::retry_result::RetryResult;
use std::time::{Duration, Instant};

/// Determines how errors are handled in the retry loop.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Query the retry policy after an error.
    ///
    /// # Parameters
    /// * `loop_start` - when the retry loop started.
    /// * `attempt_count` - the number of attempts. This includes the initial
    ///   attempt. This method is called after the first attempt, so the value
    ///   is always non-zero.
    /// * `idempotent` - if `true` assume the operation is idempotent. Many more
    ///   errors are retryable on idempotent operations.
    /// * `error` - the last error received from a request.
    fn on_error(
        &self,
        loop_start: Instant,
        attempt_count: u32,
        idempotent: bool,
        error: Error,
    ) -> RetryResult;

    /// The remaining time in the retry policy.
    ///
    /// For policies based on time, this returns the remaining time in the
    /// policy. For policies that are not time based this returns `None`.
    fn remaining_time(&self, _loop_start: Instant, _attempt_count: u32) -> Option<Duration> {
        None
    }
}

/// Extension trait for [`RetryPolicy`].
pub trait RetryPolicyExt: RetryPolicy + Sized {
    /// Decorate a [`RetryPolicy`] to limit the number of retry attempts.
    ///
    /// # Example
    /// ```
    /// # use gax::retry_policy::*;
    /// let policy = DefaultRetryPolicy.with_attempt_limit(3);
    /// ```
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: RetryPolicy> RetryPolicyExt for T {}

/// The default retry policy for REST management clients.
///
/// The policy stops on [non-retriable][Error::is_non_retriable] errors before
/// it inspects anything else. Otherwise it retries transport errors and
/// responses with status codes `408`, `429`, `500`, `502`, `503`, and `504`,
/// but only for idempotent requests.
///
/// This policy should be decorated to limit the number of retry attempts.
#[derive(Clone, Debug)]
pub struct DefaultRetryPolicy;

impl RetryPolicy for DefaultRetryPolicy {
    fn on_error(
        &self,
        _loop_start: Instant,
        _attempt_count: u32,
        idempotent: bool,
        error: Error,
    ) -> RetryResult {
        if error.is_non_retriable() {
            return RetryResult::Permanent(error);
        }
        let transient = match error.http_status_code() {
            Some(code) => matches!(code, 408 | 429 | 500 | 502 | 503 | 504),
            None => error.is_io(),
        };
        if transient && idempotent {
            RetryResult::Continue(error)
        } else {
            RetryResult::Permanent(error)
        }
    }
}

/// A retry policy decorator that limits the number of attempts.
///
/// # Example
/// ```
/// # use gax::retry_policy::*;
/// let policy = LimitedAttemptCount::new(3);
/// ```
#[derive(Debug)]
pub struct LimitedAttemptCount<P = DefaultRetryPolicy>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_attempts: u32,
}

impl LimitedAttemptCount {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_attempts: u32) -> Self {
        Self {
            inner: DefaultRetryPolicy,
            maximum_attempts,
        }
    }
}

impl<P> LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }
}

impl<P> RetryPolicy for LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    fn on_error(
        &self,
        loop_start: Instant,
        attempt_count: u32,
        idempotent: bool,
        error: Error,
    ) -> RetryResult {
        match self
            .inner
            .on_error(loop_start, attempt_count, idempotent, error)
        {
            RetryResult::Continue(e) if attempt_count >= self.maximum_attempts => {
                RetryResult::Exhausted(e)
            }
            flow => flow,
        }
    }

    fn remaining_time(&self, loop_start: Instant, attempt_count: u32) -> Option<Duration> {
        self.inner.remaining_time(loop_start, attempt_count)
    }
}
