//! Cache-First
//!
//! Serves a fresh cached entry when there is one and only calls the network
//! on a miss or an expired entry.

use super::{store_quietly, ResponseSource, Served};
use crate::cache::{CacheStore, Lookup, PartitionKind};
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::intercept::InterceptedRequest;
use crate::network::Network;

pub async fn cache_first(
    store: &CacheStore,
    network: &dyn Network,
    kind: PartitionKind,
    request: &InterceptedRequest,
) -> Result<Served> {
    let fallback = match store.lookup(kind, request).await {
        Lookup::Fresh(cached) => return Ok(Served::new(cached, ResponseSource::Cache)),
        Lookup::Stale(cached) => Some(cached),
        Lookup::Miss => None,
    };

    match network.fetch(request, &CancellationToken::new()).await {
        Ok(response) => {
            store_quietly(store, kind, request, &response).await;
            Ok(Served::new(response, ResponseSource::Network))
        }
        Err(e) => fallback
            .map(|stale| Served::new(stale, ResponseSource::Stale))
            .ok_or(e),
    }
}
