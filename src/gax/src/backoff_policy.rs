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

//! Defines traits for backoff policies and a common implementation.
//!
//! Retry strategies should avoid immediately retrying a request, as the
//! service may need time to recover. The clients in this workspace talk to
//! fake transports in tests and to management endpoints that return
//! `Retry-After` hints, so a constant delay is the only strategy provided.
//!
//! # Example
//! ```
//! # use gax::backoff_policy::*;
//! use std::time::{Duration, Instant};
//! let policy = ConstantBackoff::new(Duration::from_millis(250));
//! assert_eq!(policy.on_failure(Instant::now(), 1), Duration::from_millis(250));
//! ```

use std::time::{Duration, Instant};

/// Defines the trait implemented by all backoff strategies.
pub trait BackoffPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the backoff delay on a failure.
    ///
    /// # Parameters
    /// * `loop_start` - when the retry loop started.
    /// * `attempt_count` - the number of attempts. This method is always called
    ///   after the first attempt.
    fn on_failure(&self, loop_start: Instant, attempt_count: u32) -> Duration;
}

/// Waits the same amount of time after each failure.
#[derive(Clone, Debug)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    /// Creates a policy that always waits `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl std::default::Default for ConstantBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl BackoffPolicy for ConstantBackoff {
    fn on_failure(&self, _loop_start: Instant, _attempt_count: u32) -> Duration {
        self.delay
    }
}
