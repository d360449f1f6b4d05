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

//! Fake transports to unit test applications using REST management clients.
//!
//! The generated clients send every request through a [Transport]. In unit
//! tests, applications replace the network transport with a fake server:
//! each client method has a handler, and the handler returns responders
//! describing what the service should return.
//!
//! * [Responder] and [ErrorResponder] simulate single-shot operations.
//! * [PagerResponder] simulates a list operation, one page per request.
//! * [PollerResponder] simulates a long-running operation, from the initial
//!   request to the terminal response.
//!
//! The fake transports route requests using the [ApiName] extension, parse
//! the request path, validate the status codes produced by the handlers,
//! and correlate the requests of multi-step operations.
//!
//! Errors created by the fake transports are never retried by the client
//! retry loops, see [gax::error::Error::is_non_retriable].

pub mod dispatcher;
pub mod errors;
pub mod factory;
pub mod pager;
pub mod poller;
pub mod responder;
pub mod server;
pub mod tracker;
pub mod transport;

pub use dispatcher::{
    Dispatch, Invocation, PagerOperation, PollerOperation, ServerTransport, UnaryOperation,
};
pub use factory::ServerFactoryTransport;
pub use pager::PagerResponder;
pub use poller::PollerResponder;
pub use responder::{ErrorResponder, Responder};
pub use transport::{ApiName, CorrelationKey, Transport};
