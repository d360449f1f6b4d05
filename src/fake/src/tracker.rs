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

use crate::server::sanitize_pager_poller_path;
use crate::transport::CorrelationKey;
use bytes::Bytes;
use http::Request;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Correlates the requests of multi-step operations.
///
/// A pager, or a long-running operation, spans multiple requests. The fake
/// transports keep the responder for each in-flight operation in a tracker,
/// keyed by the request path without the page or status suffixes, or by the
/// [CorrelationKey] extension when present.
///
/// There is at most one live responder per key. Callers must [remove] the
/// current responder before adding a new one for the same key.
///
/// [remove]: Tracker::remove
#[derive(Debug)]
pub struct Tracker<R> {
    items: Mutex<HashMap<String, Arc<Mutex<R>>>>,
}

impl<R> std::default::Default for Tracker<R> {
    fn default() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
        }
    }
}

impl<R> Tracker<R> {
    /// Returns the responder associated with `request`, if any.
    pub fn get(&self, request: &Request<Bytes>) -> Option<Arc<Mutex<R>>> {
        let key = key(request);
        self.items
            .lock()
            .expect("tracker lock is poisoned")
            .get(&key)
            .cloned()
    }

    /// Associates `responder` with `request` and returns the shared instance.
    pub fn add(&self, request: &Request<Bytes>, responder: R) -> Arc<Mutex<R>> {
        let key = key(request);
        let responder = Arc::new(Mutex::new(responder));
        tracing::debug!("tracking operation {key}");
        self.items
            .lock()
            .expect("tracker lock is poisoned")
            .insert(key, responder.clone());
        responder
    }

    /// Returns the responder associated with `request`, creating it if needed.
    ///
    /// The tracker stays locked while `create` runs, so concurrent requests
    /// for the same operation share one responder. If `create` fails nothing
    /// is tracked and the error is returned.
    pub fn get_or_try_insert_with<F, E>(
        &self,
        request: &Request<Bytes>,
        create: F,
    ) -> Result<Arc<Mutex<R>>, E>
    where
        F: FnOnce() -> Result<R, E>,
    {
        let key = key(request);
        let mut items = self.items.lock().expect("tracker lock is poisoned");
        if let Some(r) = items.get(&key) {
            return Ok(r.clone());
        }
        let responder = Arc::new(Mutex::new(create()?));
        tracing::debug!("tracking operation {key}");
        items.insert(key, responder.clone());
        Ok(responder)
    }

    /// Removes the responder associated with `request`, if any.
    pub fn remove(&self, request: &Request<Bytes>) {
        let key = key(request);
        let removed = self
            .items
            .lock()
            .expect("tracker lock is poisoned")
            .remove(&key);
        if removed.is_some() {
            tracing::debug!("stopped tracking operation {key}");
        }
    }

    /// The number of tracked operations.
    pub fn len(&self) -> usize {
        self.items.lock().expect("tracker lock is poisoned").len()
    }

    /// Returns `true` if no operations are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(request: &Request<Bytes>) -> String {
    match request.extensions().get::<CorrelationKey>() {
        Some(k) => k.as_str().to_string(),
        None => sanitize_pager_poller_path(request.uri().path()).to_string(),
    }
}
