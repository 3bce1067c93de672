//! Integration Tests for the Intercepting Agent
//!
//! Drives the full router with a fake upstream network: lifecycle gating,
//! each caching strategy, sensitive-request exclusion and the control API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use offline_agent::cache::{CacheStore, PartitionKind, Policy, ResponseSnapshot};
use offline_agent::clock::{Clock, ManualClock, SystemClock};
use offline_agent::intercept::InterceptedRequest;
use offline_agent::{create_router, AgentError, AppState, CancellationToken, Config, Network};
use serde_json::Value;
use tower::ServiceExt;

// == Fake Network ==

#[derive(Debug, Clone)]
enum Upstream {
    Respond(u16, &'static str),
    Hang,
}

#[derive(Debug, Default)]
struct FakeNetwork {
    routes: Mutex<HashMap<String, Upstream>>,
    calls: AtomicUsize,
}

impl FakeNetwork {
    fn with_precache() -> Arc<Self> {
        let network = Arc::new(Self::default());
        network.set("/offline.html", Upstream::Respond(200, "<h1>You are offline</h1>"));
        network.set("/icons/icon-192.png", Upstream::Respond(200, "icon-192"));
        network.set("/icons/icon-512.png", Upstream::Respond(200, "icon-512"));
        network
    }

    fn set(&self, path: &str, upstream: Upstream) {
        self.routes.lock().unwrap().insert(path.to_string(), upstream);
    }

    fn clear(&self, path: &str) {
        self.routes.lock().unwrap().remove(path);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(
        &self,
        request: &InterceptedRequest,
        cancel: &CancellationToken,
    ) -> offline_agent::Result<ResponseSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let upstream = self.routes.lock().unwrap().get(request.url.path()).cloned();

        match upstream {
            Some(Upstream::Respond(status, body)) => Ok(ResponseSnapshot::new(status, body)),
            Some(Upstream::Hang) => {
                cancel.cancelled().await;
                Err(AgentError::NetworkFailure("request aborted".to_string()))
            }
            None => Err(AgentError::NetworkFailure("connection refused".to_string())),
        }
    }
}

// == Helper Functions ==

struct TestAgent {
    app: Router,
    store: Arc<CacheStore>,
}

async fn agent(config: Config, network: Arc<FakeNetwork>, clock: Arc<dyn Clock>) -> TestAgent {
    let config = Arc::new(config);
    let store = Arc::new(CacheStore::new(config.clone(), clock));
    let (state, _refresh) = AppState::new(config, store.clone(), network);
    state.lifecycle.install().await.unwrap();
    state.lifecycle.activate().await.unwrap();

    TestAgent {
        app: create_router(state),
        store,
    }
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(path: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

fn source(response: &axum::response::Response) -> &str {
    response.headers()["x-agent-source"].to_str().unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_to_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

async fn total_entries(store: &CacheStore) -> usize {
    let mut total = 0;
    for kind in PartitionKind::ALL {
        total += store.keys(kind).await.len();
    }
    total
}

// == Lifecycle Gating ==

#[tokio::test]
async fn test_requests_pass_through_before_activation() {
    let config = Arc::new(Config::default());
    let network = FakeNetwork::with_precache();
    network.set("/static/app.js", Upstream::Respond(200, "js"));
    let store = Arc::new(CacheStore::new(config.clone(), Arc::new(SystemClock)));
    let (state, _refresh) = AppState::new(config, store.clone(), network);
    let app = create_router(state);

    let response = send(&app, get("/static/app.js", &[("sec-fetch-dest", "script")])).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source(&response), "passthrough");
    assert_eq!(total_entries(&store).await, 0);
}

#[tokio::test]
async fn test_install_precaches_offline_shell() {
    let agent = agent(Config::default(), FakeNetwork::with_precache(), Arc::new(SystemClock)).await;

    assert_eq!(agent.store.keys(PartitionKind::Offline).await.len(), 3);

    let response = send(&agent.app, get("/__agent/lifecycle", &[])).await;
    let json = body_to_json(response).await;
    assert_eq!(json["state"], "activated");
    assert_eq!(json["waiting_skipped"], true);
    assert_eq!(json["pages_claimed"], true);
}

// == Scenario A: count bound ==

#[tokio::test]
async fn test_count_bound_evicts_oldest_asset() {
    let config = Config {
        asset_policy: Policy::new(2, 0),
        ..Config::default()
    };
    let network = FakeNetwork::with_precache();
    for path in ["/static/1.js", "/static/2.js", "/static/3.js"] {
        network.set(path, Upstream::Respond(200, "js"));
    }
    let agent = agent(config, network, Arc::new(SystemClock)).await;

    for path in ["/static/1.js", "/static/2.js", "/static/3.js"] {
        let response = send(&agent.app, get(path, &[("sec-fetch-dest", "script")])).await;
        assert_eq!(source(&response), "network");
    }

    assert_eq!(
        agent.store.keys(PartitionKind::Asset).await,
        vec![
            "GET http://localhost:3000/static/2.js".to_string(),
            "GET http://localhost:3000/static/3.js".to_string(),
        ]
    );
}

// == Scenario B: age bound ==

#[tokio::test]
async fn test_age_bound_fresh_then_stale() {
    let config = Config {
        image_policy: Policy::new(0, 1_000),
        ..Config::default()
    };
    let clock = ManualClock::new(0);
    let network = FakeNetwork::with_precache();
    network.set("/uploads/chair.jpg", Upstream::Respond(200, "chair"));
    let agent = agent(config, network.clone(), Arc::new(clock.clone())).await;
    let image = || get("/uploads/chair.jpg", &[("sec-fetch-dest", "image")]);

    let response = send(&agent.app, image()).await;
    assert_eq!(source(&response), "network");
    let calls = network.calls();

    clock.set(999);
    let response = send(&agent.app, image()).await;
    assert_eq!(source(&response), "cache");
    assert_eq!(network.calls(), calls);

    clock.set(1_001);
    network.clear("/uploads/chair.jpg");
    let response = send(&agent.app, image()).await;
    assert_eq!(source(&response), "stale");
    assert_eq!(body_text(response).await, "chair");
}

// == Scenario C: bounded navigation ==

#[tokio::test(start_paused = true)]
async fn test_hung_navigation_serves_offline_document() {
    let network = FakeNetwork::with_precache();
    network.set("/listings", Upstream::Hang);
    let agent = agent(Config::default(), network, Arc::new(SystemClock)).await;

    let start = tokio::time::Instant::now();
    let response = send(&agent.app, get("/listings", &[("sec-fetch-mode", "navigate")])).await;
    let elapsed = start.elapsed();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source(&response), "offline");
    assert_eq!(body_text(response).await, "<h1>You are offline</h1>");
    assert!(elapsed >= Duration::from_millis(4500), "too early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(4600), "too late: {:?}", elapsed);
}

#[tokio::test]
async fn test_navigation_error_page_is_relayed() {
    let network = FakeNetwork::with_precache();
    network.set("/missing", Upstream::Respond(404, "not here"));
    let agent = agent(Config::default(), network, Arc::new(SystemClock)).await;

    let response = send(&agent.app, get("/missing", &[("accept", "text/html")])).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(source(&response), "network");
}

// == Scenario D: sensitive requests ==

#[tokio::test]
async fn test_authorized_request_never_stored() {
    let network = FakeNetwork::with_precache();
    network.set("/home", Upstream::Respond(200, "private"));
    let agent = agent(Config::default(), network, Arc::new(SystemClock)).await;
    let before = total_entries(&agent.store).await;

    let response = send(
        &agent.app,
        get(
            "/home",
            &[
                ("authorization", "Bearer X"),
                ("sec-fetch-mode", "cors"),
                ("sec-fetch-dest", "empty"),
            ],
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source(&response), "passthrough");
    assert_eq!(total_entries(&agent.store).await, before);
}

#[tokio::test]
async fn test_signed_url_never_stored() {
    let network = FakeNetwork::with_precache();
    network.set("/uploads/doc.png", Upstream::Respond(200, "signed"));
    let agent = agent(Config::default(), network, Arc::new(SystemClock)).await;

    let response = send(
        &agent.app,
        get("/uploads/doc.png?X-Amz-Signature=abc", &[("sec-fetch-dest", "image")]),
    )
    .await;

    assert_eq!(source(&response), "passthrough");
    assert!(agent.store.keys(PartitionKind::Image).await.is_empty());
}

#[tokio::test]
async fn test_post_is_forwarded_untouched() {
    let network = FakeNetwork::with_precache();
    network.set("/static/form", Upstream::Respond(201, "created"));
    let agent = agent(Config::default(), network, Arc::new(SystemClock)).await;

    let request = Request::builder()
        .method("POST")
        .uri("/static/form")
        .body(Body::from("a=1"))
        .unwrap();
    let response = send(&agent.app, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(source(&response), "passthrough");
    assert!(agent.store.keys(PartitionKind::Asset).await.is_empty());
}

// == Control API ==

#[tokio::test]
async fn test_stats_report_partitions() {
    let network = FakeNetwork::with_precache();
    network.set("/static/app.css", Upstream::Respond(200, "css"));
    let agent = agent(Config::default(), network, Arc::new(SystemClock)).await;

    send(&agent.app, get("/static/app.css", &[("sec-fetch-dest", "style")])).await;
    send(&agent.app, get("/static/app.css", &[("sec-fetch-dest", "style")])).await;

    let json = body_to_json(send(&agent.app, get("/__agent/stats", &[])).await).await;
    assert_eq!(json["total_entries"], 4);

    let partitions = json["partitions"].as_array().unwrap();
    let assets = partitions
        .iter()
        .find(|p| p["name"] == "static-v1")
        .unwrap();
    assert_eq!(assets["entries"], 1);
    assert_eq!(assets["hits"], 1);
    assert_eq!(assets["misses"], 1);
}

#[tokio::test]
async fn test_health_reports_lifecycle() {
    let agent = agent(Config::default(), FakeNetwork::with_precache(), Arc::new(SystemClock)).await;

    let response = send(&agent.app, get("/__agent/health", &[])).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["lifecycle"], "activated");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_push_payload_becomes_notification() {
    let agent = agent(Config::default(), FakeNetwork::with_precache(), Arc::new(SystemClock)).await;

    let request = Request::builder()
        .method("POST")
        .uri("/__agent/push")
        .body(Body::from(r#"{"title":"Order shipped","url":"/orders/7"}"#))
        .unwrap();
    let json = body_to_json(send(&agent.app, request).await).await;

    assert_eq!(json["title"], "Order shipped");
    assert_eq!(json["body"], "");
    assert_eq!(json["url"], "/orders/7");
    assert_eq!(json["badge"], "/icons/icon-192.png");
}

#[tokio::test]
async fn test_notification_click_routes_to_window() {
    let agent = agent(Config::default(), FakeNetwork::with_precache(), Arc::new(SystemClock)).await;

    let focus = Request::builder()
        .method("POST")
        .uri("/__agent/notification-click")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"url":"/orders/7","windows":[{"id":"w1","url":"http://localhost:3000/orders/7#top"}]}"#,
        ))
        .unwrap();
    let json = body_to_json(send(&agent.app, focus).await).await;
    assert_eq!(json["action"], "focus");
    assert_eq!(json["window_id"], "w1");

    let open = Request::builder()
        .method("POST")
        .uri("/__agent/notification-click")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"url":"/orders/8","windows":[]}"#))
        .unwrap();
    let json = body_to_json(send(&agent.app, open).await).await;
    assert_eq!(json["action"], "open");
    assert_eq!(json["url"], "http://localhost:3000/orders/8");
}
