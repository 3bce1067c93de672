//! API Routes
//!
//! Configures the Axum router: control endpoints under `/__agent`, with the
//! proxy handler as the fallback for everything else.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, lifecycle_handler, notification_click_handler, proxy_handler, push_handler,
    stats_handler, AppState,
};

/// Path prefix reserved for the control API.
pub const CONTROL_PREFIX: &str = "/__agent";

/// Creates the main router.
///
/// # Middleware
/// - CORS: Allows any origin on the control API only
/// - Tracing: Logs all requests, intercepted ones included
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let control = Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/lifecycle", get(lifecycle_handler))
        .route("/push", post(push_handler))
        .route("/notification-click", post(notification_click_handler))
        .layer(cors);

    Router::new()
        .nest(CONTROL_PREFIX, control)
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
