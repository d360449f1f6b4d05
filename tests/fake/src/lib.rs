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

pub mod widgets;

/// Enables tracing for the current test.
pub fn enable_tracing() -> ::tracing::subscriber::DefaultGuard {
    #[cfg(feature = "log-integration-tests")]
    let max_level = tracing::Level::DEBUG;
    #[cfg(not(feature = "log-integration-tests"))]
    let max_level = tracing::Level::WARN;
    let subscriber = tracing_subscriber::fmt()
        .with_level(true)
        .with_thread_ids(true)
        .with_test_writer()
        .with_max_level(max_level)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::enable_tracing;
    use super::widgets::client::WidgetsClient;
    use super::widgets::model::{Widget, WidgetListResult};
    use super::widgets::server::{
        WidgetsServer, new_server_factory_transport, new_widgets_server_transport,
    };
    use anyhow::Result;
    use bytes::Bytes;
    use fake::poller::NonTerminalResponseOptions;
    use fake::transport::{ApiName, Transport};
    use fake::{ErrorResponder, PagerResponder, PollerResponder, Responder, ServerTransport};
    use futures::TryStreamExt;
    use gax::retry_policy::{DefaultRetryPolicy, RetryPolicyExt};
    use lro::{Poller, PollingResult};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use test_case::test_case;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ENDPOINT: &str = "https://management.example.com";

    fn new_client<T: Transport + 'static>(transport: T) -> WidgetsClient {
        WidgetsClient::new(ENDPOINT, "sub", transport)
    }

    fn get_server() -> WidgetsServer {
        WidgetsServer {
            get: Some(Box::new(|resource_group: &str, name: &str| {
                let mut responder = Responder::default();
                let widget = Widget::new(name).set_location(format!("{resource_group}-location"));
                responder.set_response(200, widget, None);
                (responder, ErrorResponder::default())
            })),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn get() -> Result<()> {
        let _guard = enable_tracing();
        let client = new_client(new_widgets_server_transport(get_server())?);
        let got = client.get("rg", "w 001").await?;
        assert_eq!(got, Widget::new("w 001").set_location("rg-location"));
        Ok(())
    }

    #[tokio::test]
    async fn get_response_error() -> Result<()> {
        let _guard = enable_tracing();
        let server = WidgetsServer {
            get: Some(Box::new(|_: &str, _: &str| {
                let mut errors = ErrorResponder::default();
                errors.set_response_error(404, "ResourceNotFound");
                (Responder::default(), errors)
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?);
        let err = client.get("rg", "w-001").await.unwrap_err();
        assert!(err.is_non_retriable(), "{err:?}");
        assert_eq!(err.http_status_code(), Some(404));
        let inner = err.response_error().expect("error is a ResponseError");
        assert_eq!(inner.error_code(), "ResourceNotFound");

        let display = err.to_string();
        let lines = display.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            format!(
                "GET {ENDPOINT}/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Fake/widgets/w-001?api-version={}",
                super::widgets::client::API_VERSION
            )
        );
        assert_eq!(lines[1], "-".repeat(80));
        assert_eq!(lines[2], "RESPONSE 404: 404 Not Found");
        assert_eq!(lines[3], "ERROR CODE: ResourceNotFound");
        assert_eq!(lines[5], "Response contained no body");
        Ok(())
    }

    #[tokio::test]
    async fn not_implemented() -> Result<()> {
        let _guard = enable_tracing();
        let client = new_client(new_widgets_server_transport(WidgetsServer::default())?);
        let err = client.get("rg", "w-001").await.unwrap_err();
        assert!(err.is_non_retriable(), "{err:?}");
        assert_eq!(err.to_string(), "fake for method Get not implemented");

        let err = client.delete("rg", "w-001").await.unwrap_err();
        assert_eq!(err.to_string(), "fake for method Delete not implemented");
        Ok(())
    }

    #[test_case(200; "OK")]
    #[test_case(202; "Accepted")]
    #[test_case(204; "No Content")]
    #[tokio::test]
    async fn delete(status: u16) -> Result<()> {
        let _guard = enable_tracing();
        let server = WidgetsServer {
            delete: Some(Box::new(move |_: &str, _: &str| {
                let mut responder = Responder::default();
                responder.set_response(status, (), None);
                (responder, ErrorResponder::default())
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?);
        client.delete("rg", "w-001").await?;
        Ok(())
    }

    #[tokio::test]
    async fn delete_unexpected_status() -> Result<()> {
        let _guard = enable_tracing();
        let server = WidgetsServer {
            delete: Some(Box::new(|_: &str, _: &str| {
                let mut responder = Responder::default();
                responder.set_response(201, (), None);
                (responder, ErrorResponder::default())
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?);
        let err = client.delete("rg", "w-001").await.unwrap_err();
        assert!(err.is_non_retriable(), "{err:?}");
        assert_eq!(
            err.to_string(),
            "unexpected status code 201. acceptable values are 200, 202, 204"
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn fake_errors_are_never_retried() -> Result<()> {
        let _guard = enable_tracing();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let server = WidgetsServer {
            get: Some(Box::new(move |_: &str, _: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut errors = ErrorResponder::default();
                errors.set_response_error(503, "ServiceUnavailable");
                (Responder::default(), errors)
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?)
            .with_retry_policy(DefaultRetryPolicy.with_attempt_limit(5));
        let err = client.get("rg", "w-001").await.unwrap_err();
        assert!(err.is_non_retriable(), "{err:?}");
        assert!(!err.is_exhausted(), "{err:?}");
        assert_eq!(err.http_status_code(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    /// Returns `503` responses before forwarding requests to a fake server.
    #[derive(Debug)]
    struct Unavailable {
        remaining: AtomicUsize,
        inner: ServerTransport,
    }

    impl Transport for Unavailable {
        fn send(&self, request: http::Request<Bytes>) -> gax::Result<http::Response<Bytes>> {
            let failing = self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                let response = http::Response::builder()
                    .status(503)
                    .header("x-ms-error-code", "ServiceUnavailable")
                    .body(Bytes::new())
                    .map_err(gax::error::Error::other)?;
                return Ok(response);
            }
            self.inner.send(request)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn service_errors_are_retried() -> Result<()> {
        let _guard = enable_tracing();
        let transport = Unavailable {
            remaining: AtomicUsize::new(2),
            inner: new_widgets_server_transport(get_server())?,
        };
        let client =
            new_client(transport).with_retry_policy(DefaultRetryPolicy.with_attempt_limit(5));
        let start = tokio::time::Instant::now();
        let got = client.get("rg", "w-001").await?;
        assert_eq!(got, Widget::new("w-001").set_location("rg-location"));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        Ok(())
    }

    fn scenario_a_server() -> WidgetsServer {
        WidgetsServer {
            new_list_pager: Some(Box::new(|_: &str| {
                let mut pager = PagerResponder::default();
                pager.add_error("one");
                pager.add_page(
                    200,
                    WidgetListResult::new([Widget::new("a"), Widget::new("b")]),
                    None,
                );
                pager.add_error("two");
                pager.add_page(200, WidgetListResult::new([Widget::new("c")]), None);
                pager.add_response_error(400, "BlewUp");
                pager
            })),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn list_pages() -> Result<()> {
        let _guard = enable_tracing();
        let client = new_client(new_widgets_server_transport(scenario_a_server())?);
        let mut pages = client.list("rg");

        let err = pages.next_page().await.expect("more pages").unwrap_err();
        assert!(err.is_non_retriable(), "{err:?}");
        assert_eq!(err.to_string(), "one");
        assert!(pages.more(), "{pages:?}");

        let page = pages.next_page().await.expect("more pages")?;
        assert_eq!(page.value, vec![Widget::new("a"), Widget::new("b")]);
        assert_eq!(
            page.next_link.as_deref(),
            Some(
                "https://management.example.com/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Fake/widgets/page_1"
            )
        );

        let err = pages.next_page().await.expect("more pages").unwrap_err();
        assert_eq!(err.to_string(), "two");

        let page = pages.next_page().await.expect("more pages")?;
        assert_eq!(page.value, vec![Widget::new("c")]);
        assert_eq!(page.next_link, None);
        assert!(!pages.more(), "{pages:?}");
        assert!(pages.next_page().await.is_none());

        // The trailing error is still queued for this resource group.
        let mut pages = client.list("rg");
        let err = pages.next_page().await.expect("more pages").unwrap_err();
        assert!(err.is_non_retriable(), "{err:?}");
        let inner = err.response_error().expect("error is a ResponseError");
        assert_eq!(inner.error_code(), "BlewUp");
        assert_eq!(inner.status_code(), 400);

        // The sequence is exhausted, the next call starts over.
        let mut pages = client.list("rg");
        let err = pages.next_page().await.expect("more pages").unwrap_err();
        assert_eq!(err.to_string(), "one");
        Ok(())
    }

    #[tokio::test]
    async fn list_stream() -> Result<()> {
        let _guard = enable_tracing();
        let server = WidgetsServer {
            new_list_pager: Some(Box::new(|resource_group: &str| {
                let mut pager = PagerResponder::default();
                for name in ["a", "b", "c"] {
                    let widget = Widget::new(format!("{resource_group}/{name}"));
                    pager.add_page(200, WidgetListResult::new([widget]), None);
                }
                pager
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?);
        let pages = client
            .list("rg")
            .into_stream()
            .try_collect::<Vec<_>>()
            .await?;
        let names = pages
            .into_iter()
            .flat_map(|p| p.value)
            .map(|w| w.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["rg/a", "rg/b", "rg/c"]);
        Ok(())
    }

    fn scenario_b_server() -> WidgetsServer {
        WidgetsServer {
            begin_create_or_update: Some(Box::new(|_: &str, name: &str, body: Widget| {
                let mut poller = PollerResponder::default();
                poller.add_non_terminal_response(200, None);
                poller.add_polling_error("network glitch");
                poller.add_non_terminal_response(200, None);
                let mut result = body;
                result.name = name.to_string();
                poller.set_terminal_response(200, result, None);
                (poller, ErrorResponder::default())
            })),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_poll() -> Result<()> {
        let _guard = enable_tracing();
        let client = new_client(new_widgets_server_transport(scenario_b_server())?);
        let mut poller =
            client.create_or_update("rg", "dodo", Widget::new("ignored").set_location("westus"));

        let status = poller.poll().await.expect("poller has a status");
        assert!(matches!(status, PollingResult::InProgress), "{status:?}");

        let status = poller.poll().await.expect("poller has a status");
        match status {
            PollingResult::PollingError(e) => {
                assert!(e.is_non_retriable(), "{e:?}");
                assert_eq!(e.to_string(), "network glitch");
            }
            _ => panic!("expected a polling error, got {status:?}"),
        };

        let status = poller.poll().await.expect("poller has a status");
        assert!(matches!(status, PollingResult::InProgress), "{status:?}");

        let status = poller.poll().await.expect("poller has a status");
        let response = match status {
            PollingResult::Completed(r) => r?,
            _ => panic!("expected a completed polling result, got {status:?}"),
        };
        assert_eq!(response, Widget::new("dodo").set_location("westus"));

        let status = poller.poll().await;
        assert!(status.is_none(), "{status:?}");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn create_until_done() -> Result<()> {
        let _guard = enable_tracing();
        let server = WidgetsServer {
            begin_create_or_update: Some(Box::new(|_: &str, name: &str, _: Widget| {
                let mut poller = PollerResponder::default();
                poller.add_non_terminal_response(
                    201,
                    Some(
                        NonTerminalResponseOptions::default()
                            .set_retry_after(Duration::from_secs(5)),
                    ),
                );
                poller.add_non_terminal_response(200, None);
                poller.set_terminal_response(200, Widget::new(name), None);
                (poller, ErrorResponder::default())
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?)
            .with_polling_frequency(Duration::from_secs(10));
        let start = tokio::time::Instant::now();
        let response = client
            .create_or_update("rg", "dodo", Widget::default())
            .until_done()
            .await?;
        assert_eq!(response, Widget::new("dodo"));
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn create_terminal_error() -> Result<()> {
        let _guard = enable_tracing();
        let server = WidgetsServer {
            begin_create_or_update: Some(Box::new(|_: &str, _: &str, _: Widget| {
                let mut poller = PollerResponder::default();
                poller.add_non_terminal_response(201, None);
                poller.set_terminal_error(409, "Conflict");
                (poller, ErrorResponder::default())
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?);

        let mut poller = client.create_or_update("rg", "dodo", Widget::default());
        let status = poller.poll().await.expect("poller has a status");
        assert!(matches!(status, PollingResult::InProgress), "{status:?}");
        let status = poller.poll().await.expect("poller has a status");
        let err = match status {
            PollingResult::Completed(Err(e)) => e,
            _ => panic!("expected a completed polling result with an error, got {status:?}"),
        };
        assert_eq!(err.http_status_code(), Some(409));
        let inner = err.response_error().expect("error is a ResponseError");
        assert_eq!(inner.error_code(), "Conflict");
        let status = poller.poll().await;
        assert!(status.is_none(), "{status:?}");

        let err = client
            .create_or_update("rg", "dodo", Widget::default())
            .until_done()
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), Some(409));
        Ok(())
    }

    #[tokio::test]
    async fn create_start_error() -> Result<()> {
        let _guard = enable_tracing();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let server = WidgetsServer {
            begin_create_or_update: Some(Box::new(move |_: &str, _: &str, _: Widget| {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut errors = ErrorResponder::default();
                errors.set_response_error(400, "InvalidResourceName");
                (PollerResponder::default(), errors)
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?);
        for _ in 0..2 {
            let err = client
                .create_or_update("rg", "dodo", Widget::default())
                .until_done()
                .await
                .unwrap_err();
            assert!(err.is_non_retriable(), "{err:?}");
            assert_eq!(err.http_status_code(), Some(400));
        }
        // Failed starts are not tracked, each request invokes the handler.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn create_unexpected_status() -> Result<()> {
        let _guard = enable_tracing();
        let server = WidgetsServer {
            begin_create_or_update: Some(Box::new(|_: &str, _: &str, _: Widget| {
                let mut poller = PollerResponder::default();
                poller.add_non_terminal_response(202, None);
                poller.set_terminal_response(200, Widget::default(), None);
                (poller, ErrorResponder::default())
            })),
            ..Default::default()
        };
        let client = new_client(new_widgets_server_transport(server)?);
        let err = client
            .create_or_update("rg", "dodo", Widget::default())
            .until_done()
            .await
            .unwrap_err();
        assert!(err.is_non_retriable(), "{err:?}");
        assert_eq!(
            err.to_string(),
            "unexpected status code 202. acceptable values are 200, 201"
        );
        Ok(())
    }

    #[tokio::test]
    async fn factory() -> Result<()> {
        let _guard = enable_tracing();
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let transport = Arc::new(new_server_factory_transport(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            get_server()
        }));
        let client = new_client(transport.clone());
        for name in ["w-001", "w-002"] {
            let got = client.get("rg", name).await?;
            assert_eq!(got, Widget::new(name).set_location("rg-location"));
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);

        let mut request = http::Request::builder()
            .uri(format!("{ENDPOINT}/gadgets/g-001"))
            .body(Bytes::new())?;
        request
            .extensions_mut()
            .insert(ApiName::new("GadgetsClient.Get"));
        let err = transport.send(request).unwrap_err();
        assert!(err.is_non_retriable(), "{err:?}");
        assert_eq!(err.to_string(), "unhandled client GadgetsClient");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_requests() -> Result<()> {
        let _guard = enable_tracing();
        let client = new_client(new_widgets_server_transport(get_server())?);
        let tasks = (0..8)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move { client.get("rg", &format!("w-{i:03}")).await })
            })
            .collect::<Vec<_>>();
        for (i, task) in tasks.into_iter().enumerate() {
            let got = task.await??;
            assert_eq!(got.name, format!("w-{i:03}"));
        }
        Ok(())
    }
}
