//! Offline Agent - a request-intercepting caching agent
//!
//! Classifies every outbound request, answers it with a caching strategy
//! backed by versioned, size- and age-bounded partitions, and falls back to a
//! precached offline document when navigations cannot reach the network.

pub mod api;
pub mod cache;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod intercept;
pub mod lifecycle;
pub mod models;
pub mod network;
pub mod push;
pub mod strategy;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::CacheStore;
pub use cancel::CancellationToken;
pub use config::Config;
pub use error::{AgentError, Result};
pub use lifecycle::LifecycleController;
pub use network::{HttpNetwork, Network};
pub use strategy::Dispatcher;
