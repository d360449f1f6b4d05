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
use crate::transport::{ApiName, Transport};
use bytes::Bytes;
use gax::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Constructor = Box<dyn Fn() -> Arc<dyn Transport> + Send + Sync>;

struct Client {
    constructor: Constructor,
    transport: Mutex<Option<Arc<dyn Transport>>>,
}

impl Client {
    fn transport(&self) -> Arc<dyn Transport> {
        let mut guard = self.transport.lock().expect("client lock is poisoned");
        guard.get_or_insert_with(|| (self.constructor)()).clone()
    }
}

/// A fake transport covering several clients of the same service.
///
/// Applications often create more than one client for a service, for
/// example to manage widgets and their gadgets. This transport routes each
/// request to the fake transport of the client in its [ApiName]. The
/// transport for each client is created on first use, and reused for all
/// the following requests.
///
/// # Example
/// ```
/// # use fake::dispatcher::ServerTransport;
/// # use fake::factory::ServerFactoryTransport;
/// let transport = ServerFactoryTransport::new()
///     .register("WidgetsClient", ServerTransport::new)
///     .register("GadgetsClient", ServerTransport::new);
/// ```
#[derive(Default)]
pub struct ServerFactoryTransport {
    clients: HashMap<String, Client>,
}

impl ServerFactoryTransport {
    /// Creates a transport without any clients.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the constructor for the fake transport of a client.
    pub fn register<F, T>(mut self, client: &str, constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Transport + 'static,
    {
        let constructor: Constructor = Box::new(move || Arc::new(constructor()));
        self.clients.insert(
            client.to_string(),
            Client {
                constructor,
                transport: Mutex::new(None),
            },
        );
        self
    }
}

impl Transport for ServerFactoryTransport {
    fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let Some(name) = request.extensions().get::<ApiName>() else {
            return Err(FakeError::MissingApiName.into());
        };
        let Some(client) = name.client() else {
            return Err(FakeError::MalformedApiName(name.to_string()).into());
        };
        let Some(entry) = self.clients.get(client) else {
            tracing::warn!("no fake server registered for {client}");
            return Err(FakeError::UnhandledClient(client.to_string()).into());
        };
        entry.transport().send(request)
    }
}

impl std::fmt::Debug for ServerFactoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut clients = self.clients.keys().collect::<Vec<_>>();
        clients.sort();
        f.debug_struct("ServerFactoryTransport")
            .field("clients", &clients)
            .finish()
    }
}
