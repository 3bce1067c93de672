//! API Module
//!
//! The intercepting proxy and the agent's control API.
//!
//! # Endpoints
//! - `GET /__agent/health` - Health check with lifecycle state
//! - `GET /__agent/stats` - Per-partition cache statistics
//! - `GET /__agent/lifecycle` - Lifecycle state and flags
//! - `POST /__agent/push` - Turn a push payload into a notification
//! - `POST /__agent/notification-click` - Route a notification click
//! - anything else - Intercepted and dispatched to a caching strategy

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
