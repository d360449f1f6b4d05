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

use super::Result;
use super::backoff_policy::BackoffPolicy;
use super::error::Error;
use super::retry_policy::RetryPolicy;
use super::retry_result::RetryResult;
use std::sync::Arc;
use std::time::Duration;

/// Runs the retry loop for a given function.
///
/// This functions calls an inner function as long as (1) the retry policy has
/// not expired, and (2) the inner function has not returned a successful
/// request.
///
/// In between calls the function waits the amount of time prescribed by the
/// backoff policy, using `sleep` to implement any sleep.
pub async fn retry_loop<F, S, Response>(
    mut inner: F,
    sleep: S,
    idempotent: bool,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
) -> Result<Response>
where
    F: AsyncFnMut(Option<Duration>) -> Result<Response> + Send,
    S: AsyncFn(Duration) -> () + Send,
{
    let loop_start = tokio::time::Instant::now().into_std();
    let mut attempt_count = 0;
    loop {
        let remaining_time = retry_policy.remaining_time(loop_start, attempt_count);
        attempt_count += 1;
        let error = match inner(remaining_time).await {
            Ok(r) => return Ok(r),
            Err(e) => e,
        };
        let delay = match retry_policy.on_error(loop_start, attempt_count, idempotent, error) {
            RetryResult::Permanent(e) => {
                tracing::debug!("permanent error on attempt {attempt_count}: {e}");
                return Err(e);
            }
            RetryResult::Exhausted(e) => {
                tracing::debug!("retry policy exhausted after {attempt_count} attempts");
                return Err(Error::exhausted(e));
            }
            RetryResult::Continue(e) => {
                let delay = backoff_policy.on_failure(loop_start, attempt_count);
                if retry_policy
                    .remaining_time(loop_start, attempt_count)
                    .is_some_and(|remaining| remaining < delay)
                {
                    return Err(Error::exhausted(e));
                }
                tracing::debug!("retrying attempt {attempt_count} in {delay:?}: {e}");
                delay
            }
        };
        sleep(delay).await;
    }
}
