// crates/gatehouse-core/tests/proxy_redirects.rs
// ============================================================================
// Module: Proxy Redirect Tests
// Description: Integration tests for credentialed proxy redirect safety.
// Purpose: Prove the service credential never crosses an origin boundary.
// Dependencies: gatehouse-core, tiny_http, tokio
// ============================================================================

//! Credentialed proxy redirect-safety integration tests.
//!
//! Each test spins up one or two stub origins with `tiny_http` and asserts
//! which hops carried the `Authorization` header.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use gatehouse_core::CallDescriptor;
use gatehouse_core::GatewayError;
use gatehouse_core::InternalApiClient;
use gatehouse_core::ProxyConfig;
use url::Url;

/// One observed request: URL path and the Authorization header, if any.
type ObservedRequest = (String, Option<String>);

/// Stub origin that records inbound requests and replies via a closure.
struct StubOrigin {
    /// Base URL of the stub.
    base: Url,
    /// Requests observed so far.
    observed: Arc<Mutex<Vec<ObservedRequest>>>,
}

impl StubOrigin {
    /// Spawns a stub server; `respond` maps a request path to
    /// `(status, body, location)`.
    fn spawn(
        respond: impl Fn(&str) -> (u16, String, Option<String>) + Send + 'static,
    ) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&observed);
        thread::spawn(move || {
            for request in server.incoming_requests() {
                let auth = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_string());
                seen.lock().unwrap().push((request.url().to_string(), auth));
                let (status, body, location) = respond(request.url());
                let mut response =
                    tiny_http::Response::from_string(body).with_status_code(status);
                if let Some(location) = location {
                    response = response.with_header(
                        tiny_http::Header::from_bytes(&b"Location"[..], location.as_bytes())
                            .unwrap(),
                    );
                }
                let _ = request.respond(response);
            }
        });
        Self {
            base,
            observed,
        }
    }

    fn observed(&self) -> Vec<ObservedRequest> {
        self.observed.lock().unwrap().clone()
    }
}

fn client(origin: &Url, max_redirects: u32, timeout_ms: u64) -> InternalApiClient {
    InternalApiClient::new(ProxyConfig {
        internal_origin: origin.clone(),
        credential: "svc-secret".to_string(),
        connect_timeout_ms: 1_000,
        timeout_ms,
        max_redirects,
        max_response_bytes: 64 * 1024,
        user_agent: "gatehouse-test/0.1".to_string(),
    })
    .unwrap()
}

fn get_descriptor(path: &str) -> CallDescriptor {
    CallDescriptor {
        method: None,
        path: Some(path.to_string()),
        body: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cross_origin_redirect_strips_credential() {
    let third_party = StubOrigin::spawn(|_| (200, "captured".to_string(), None));
    let capture_url = third_party.base.join("/capture").unwrap().to_string();
    let internal = StubOrigin::spawn(move |_| (302, String::new(), Some(capture_url.clone())));

    let client = client(&internal.base, 1, 2_000);
    let response = client.call(&get_descriptor("/start")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "captured");

    let first_hop = internal.observed();
    assert_eq!(first_hop.len(), 1);
    assert_eq!(first_hop[0].1.as_deref(), Some("Bearer svc-secret"));

    let second_hop = third_party.observed();
    assert_eq!(second_hop.len(), 1);
    assert_eq!(second_hop[0].1, None, "credential must not cross the origin boundary");
}

#[tokio::test(flavor = "multi_thread")]
async fn same_origin_redirect_keeps_credential() {
    let internal = StubOrigin::spawn(|path| {
        if path == "/start" {
            (302, String::new(), Some("/final".to_string()))
        } else {
            (200, "final".to_string(), None)
        }
    });

    let client = client(&internal.base, 1, 2_000);
    let response = client.call(&get_descriptor("/start")).await.unwrap();

    assert_eq!(response.status, 200);
    let observed = internal.observed();
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[0].1.as_deref(), Some("Bearer svc-secret"));
    assert_eq!(observed[1].0, "/final");
    assert_eq!(observed[1].1.as_deref(), Some("Bearer svc-secret"));
}

#[tokio::test(flavor = "multi_thread")]
async fn default_policy_returns_redirect_verbatim() {
    let internal =
        StubOrigin::spawn(|_| (302, String::new(), Some("http://example.org/x".to_string())));

    let client = client(&internal.base, 0, 2_000);
    let response = client.call(&get_descriptor("/start")).await.unwrap();

    assert_eq!(response.status, 302);
    assert_eq!(response.headers.get("location").map(String::as_str), Some("http://example.org/x"));
    assert_eq!(internal.observed().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn upstream_timeout_surfaces_generic_error() {
    let internal = StubOrigin::spawn(|_| {
        thread::sleep(std::time::Duration::from_millis(500));
        (200, "late".to_string(), None)
    });

    let client = client(&internal.base, 0, 100);
    let err = client.call(&get_descriptor("/slow")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Upstream { .. }));
    assert_eq!(err.to_string(), "upstream request failed");
}

#[tokio::test(flavor = "multi_thread")]
async fn authority_rewriting_paths_are_rejected() {
    let internal = StubOrigin::spawn(|_| (200, "ok".to_string(), None));
    let client = client(&internal.base, 1, 2_000);

    let err = client.call(&get_descriptor("//evil.example/x")).await.unwrap_err();
    assert!(matches!(err, GatewayError::BadRequest(_)));

    let err = client.call(&get_descriptor("relative/path")).await.unwrap_err();
    assert!(matches!(err, GatewayError::BadRequest(_)));

    assert!(internal.observed().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_target_path_is_rejected() {
    let internal = StubOrigin::spawn(|_| (200, "ok".to_string(), None));
    let client = client(&internal.base, 0, 2_000);
    let err = client
        .call(&CallDescriptor {
            method: Some("POST".to_string()),
            path: None,
            body: Some("{}".to_string()),
        })
        .await
        .unwrap_err();
    let GatewayError::BadRequest(message) = err else {
        panic!("expected bad request");
    };
    assert_eq!(message, "target path required");
}
