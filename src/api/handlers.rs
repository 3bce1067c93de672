//! API Handlers
//!
//! The intercepting proxy handler plus the `/__agent` control endpoints.

use std::sync::Arc;

use axum::{
    body::{self, Body, Bytes},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use tokio::task::JoinHandle;
use url::Url;

use crate::cache::{tagger::CAPTURE_HEADER, CacheStore};
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::intercept::InterceptedRequest;
use crate::lifecycle::{LifecycleController, LifecycleStatus};
use crate::models::{ClickRequest, HealthResponse, StatsResponse};
use crate::network::Network;
use crate::push::{route_click, ClickAction, Notification};
use crate::strategy::{Dispatcher, Served};
use crate::tasks::spawn_refresh_worker;

/// Response header naming where the body came from.
pub const SOURCE_HEADER: &str = "x-agent-source";

/// Headers rebuilt by the server for every response.
const STRIPPED: [&str; 4] = ["content-length", "transfer-encoding", "connection", CAPTURE_HEADER];

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<CacheStore>,
    pub dispatcher: Dispatcher,
    pub lifecycle: Arc<LifecycleController>,
}

impl AppState {
    /// Wires the dispatcher and lifecycle controller around one store and
    /// network, starting the background refresh worker.
    ///
    /// # Returns
    /// The state and the refresh worker's JoinHandle, to abort on shutdown.
    pub fn new(
        config: Arc<Config>,
        store: Arc<CacheStore>,
        network: Arc<dyn Network>,
    ) -> (Self, JoinHandle<()>) {
        let (refresh, refresh_handle) = spawn_refresh_worker(store.clone(), network.clone());
        let dispatcher = Dispatcher::new(&config, store.clone(), network.clone(), refresh);
        let lifecycle = Arc::new(LifecycleController::new(config.clone(), store.clone(), network));

        let state = Self {
            config,
            store,
            dispatcher,
            lifecycle,
        };
        (state, refresh_handle)
    }
}

// == Proxy ==
/// Fallback handler: every request outside `/__agent` is intercepted here.
///
/// Until the lifecycle controller has claimed pages, requests are forwarded
/// as passthrough.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let intercepted = intercept(&state.config, request).await?;

    let served = if state.lifecycle.controls_pages() {
        state.dispatcher.handle(&intercepted).await?
    } else {
        state.dispatcher.passthrough(&intercepted).await?
    };

    Ok(to_response(served))
}

/// Converts an inbound HTTP request into an [`InterceptedRequest`].
///
/// Relative URIs are addressed to the public origin. Absolute-form URIs are
/// accepted only when they name the public origin; the agent never relays to
/// another host.
pub async fn intercept(config: &Config, request: Request) -> Result<InterceptedRequest> {
    let (parts, body) = request.into_parts();

    let public = Url::parse(&config.public_origin)
        .map_err(|e| AgentError::InvalidRequest(format!("invalid public origin: {}", e)))?;

    let url = if parts.uri.scheme().is_some() {
        Url::parse(&parts.uri.to_string())
    } else {
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        public.join(path)
    }
    .map_err(|e| AgentError::InvalidRequest(format!("invalid request URL: {}", e)))?;

    if url.origin() != public.origin() {
        return Err(AgentError::InvalidRequest(format!(
            "refusing to forward to foreign origin {}",
            url.origin().ascii_serialization()
        )));
    }

    let body = body::to_bytes(body, config.max_body_bytes)
        .await
        .map_err(|e| AgentError::InvalidRequest(format!("failed to read body: {}", e)))?;

    Ok(InterceptedRequest::new(parts.method, url, parts.headers, body))
}

/// Builds the outgoing HTTP response, tagging it with its source.
pub fn to_response(served: Served) -> Response {
    let Served { response, source } = served;

    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        if STRIPPED.iter().any(|s| name.eq_ignore_ascii_case(s)) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    headers.insert(SOURCE_HEADER, HeaderValue::from_static(source.as_str()));

    out
}

// == Control API ==
/// Handler for GET /__agent/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.lifecycle.state().await))
}

/// Handler for GET /__agent/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.store.stats().await))
}

/// Handler for GET /__agent/lifecycle
pub async fn lifecycle_handler(State(state): State<AppState>) -> Json<LifecycleStatus> {
    Json(state.lifecycle.status().await)
}

/// Handler for POST /__agent/push
///
/// The body is the raw push payload; the response is the notification to show.
pub async fn push_handler(State(state): State<AppState>, payload: Bytes) -> Json<Notification> {
    Json(Notification::from_payload(&payload, &state.config))
}

/// Handler for POST /__agent/notification-click
pub async fn notification_click_handler(
    State(state): State<AppState>,
    Json(req): Json<ClickRequest>,
) -> Result<Json<ClickAction>> {
    if let Some(error_msg) = req.validate() {
        return Err(AgentError::InvalidRequest(error_msg));
    }

    Ok(Json(route_click(req.url.as_deref(), &req.windows, &state.config)))
}
