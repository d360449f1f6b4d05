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

//! A fake server for [WidgetsClient][super::client::WidgetsClient], shaped
//! like the generated fakes.

use super::model::{Widget, WidgetListResult};
use fake::dispatcher::{PagerOperation, PollerOperation, ServerTransport, UnaryOperation};
use fake::factory::ServerFactoryTransport;
use fake::pager::PagerResponder;
use fake::poller::PollerResponder;
use fake::responder::{ErrorResponder, Responder};
use fake::server::empty_response;
use fake::transport::Transport;
use gax::Result;

const WIDGET_PATH: &str = r"^/subscriptions/(?P<subscriptionId>[^/]+)/resourceGroups/(?P<resourceGroupName>[^/]+)/providers/Microsoft\.Fake/widgets/(?P<widgetName>[^/]+)$";
const LIST_PATH: &str = r"^/subscriptions/(?P<subscriptionId>[^/]+)/resourceGroups/(?P<resourceGroupName>[^/]+)/providers/Microsoft\.Fake/widgets$";

pub type GetHandler = Box<dyn Fn(&str, &str) -> (Responder<Widget>, ErrorResponder) + Send + Sync>;
pub type DeleteHandler = Box<dyn Fn(&str, &str) -> (Responder<()>, ErrorResponder) + Send + Sync>;
pub type ListHandler = Box<dyn Fn(&str) -> PagerResponder<WidgetListResult> + Send + Sync>;
pub type CreateOrUpdateHandler =
    Box<dyn Fn(&str, &str, Widget) -> (PollerResponder<Widget>, ErrorResponder) + Send + Sync>;

/// The handlers for each [WidgetsClient][super::client::WidgetsClient]
/// method.
///
/// Methods without a handler fail with a "not implemented" error.
#[derive(Default)]
pub struct WidgetsServer {
    /// Handles `WidgetsClient::get()`.
    pub get: Option<GetHandler>,
    /// Handles `WidgetsClient::delete()`.
    pub delete: Option<DeleteHandler>,
    /// Handles `WidgetsClient::list()`.
    pub new_list_pager: Option<ListHandler>,
    /// Handles `WidgetsClient::create_or_update()`.
    pub begin_create_or_update: Option<CreateOrUpdateHandler>,
}

/// Creates a transport routing [WidgetsClient][super::client::WidgetsClient]
/// requests to `server`.
pub fn new_widgets_server_transport(server: WidgetsServer) -> Result<ServerTransport> {
    let WidgetsServer {
        get,
        delete,
        new_list_pager,
        begin_create_or_update,
    } = server;

    let mut get_op = UnaryOperation::<Widget>::new("Get", WIDGET_PATH, &[200])?;
    if let Some(handler) = get {
        get_op = get_op.set_handler(move |invocation| {
            let resource_group = invocation.path_param("resourceGroupName")?;
            let name = invocation.path_param("widgetName")?;
            Ok(handler(resource_group, name))
        });
    }

    let mut delete_op = UnaryOperation::<()>::new("Delete", WIDGET_PATH, &[200, 202, 204])?
        .set_encoder(|content, _, request| empty_response(content, request));
    if let Some(handler) = delete {
        delete_op = delete_op.set_handler(move |invocation| {
            let resource_group = invocation.path_param("resourceGroupName")?;
            let name = invocation.path_param("widgetName")?;
            Ok(handler(resource_group, name))
        });
    }

    let mut list_op = PagerOperation::<WidgetListResult>::new("NewListPager", LIST_PATH, &[200])?
        .set_link_injector(|page, link| page.next_link = Some(link));
    if let Some(handler) = new_list_pager {
        list_op = list_op.set_handler(move |invocation| {
            let resource_group = invocation.path_param("resourceGroupName")?;
            Ok(handler(resource_group))
        });
    }

    let mut create_op =
        PollerOperation::<Widget>::new("BeginCreateOrUpdate", WIDGET_PATH, &[200, 201])?;
    if let Some(handler) = begin_create_or_update {
        create_op = create_op.set_handler(move |invocation| {
            let resource_group = invocation.path_param("resourceGroupName")?;
            let name = invocation.path_param("widgetName")?;
            let body = invocation.body::<Widget>()?;
            Ok(handler(resource_group, name, body))
        });
    }

    Ok(ServerTransport::new()
        .register("WidgetsClient.Get", get_op)
        .register("WidgetsClient.Delete", delete_op)
        .register("WidgetsClient.NewListPager", list_op)
        .register("WidgetsClient.BeginCreateOrUpdate", create_op))
}

/// Creates a transport covering all the clients of the sample service.
///
/// The transport for each client is created on the first request for that
/// client. If that transport cannot be created, all the requests for the
/// client fail.
pub fn new_server_factory_transport<F>(new_widgets_server: F) -> ServerFactoryTransport
where
    F: Fn() -> WidgetsServer + Send + Sync + 'static,
{
    ServerFactoryTransport::new().register("WidgetsClient", move || {
        FactoryResult(new_widgets_server_transport(new_widgets_server()))
    })
}

/// Wraps the result of creating a client transport.
#[derive(Debug)]
struct FactoryResult(Result<ServerTransport>);

impl Transport for FactoryResult {
    fn send(&self, request: http::Request<bytes::Bytes>) -> Result<http::Response<bytes::Bytes>> {
        match &self.0 {
            Ok(transport) => transport.send(request),
            Err(e) => Err(gax::error::Error::non_retriable(e.to_string())),
        }
    }
}
