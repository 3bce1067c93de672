//! Strategy Module
//!
//! Caching strategies and the dispatcher that picks one per request.

mod cache_first;
mod dispatcher;
mod navigation;
mod stale_while_revalidate;

use serde::Serialize;

use crate::cache::{CacheStore, PartitionKind, ResponseSnapshot};
use crate::intercept::{Classification, InterceptedRequest};

pub use cache_first::cache_first;
pub use dispatcher::Dispatcher;
pub use navigation::bounded_network;
pub use stale_while_revalidate::stale_while_revalidate;

/// How a classified request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    StaleWhileRevalidate,
    CacheFirst,
    BoundedNetwork,
    Passthrough,
}

impl Strategy {
    pub fn for_classification(classification: Classification) -> Self {
        match classification {
            Classification::StaticAsset => Strategy::StaleWhileRevalidate,
            Classification::Image => Strategy::CacheFirst,
            Classification::Navigation => Strategy::BoundedNetwork,
            Classification::Sensitive | Classification::Unhandled => Strategy::Passthrough,
        }
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Fresh cached entry
    Cache,
    /// Network response through a caching strategy
    Network,
    /// Expired cached entry used after a network failure
    Stale,
    /// Precached offline document
    Offline,
    /// Forwarded untouched
    Passthrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::Stale => "stale",
            ResponseSource::Offline => "offline",
            ResponseSource::Passthrough => "passthrough",
        }
    }
}

/// A response plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
}

impl Served {
    pub fn new(response: ResponseSnapshot, source: ResponseSource) -> Self {
        Self { response, source }
    }
}

/// Stores a network response, ignoring refusals.
async fn store_quietly(
    store: &CacheStore,
    kind: PartitionKind,
    request: &InterceptedRequest,
    response: &ResponseSnapshot,
) {
    if let Err(e) = store.put(kind, request, response).await {
        tracing::debug!(key = %request.key(), error = %e, "response not cached");
    }
}
