//! Stale-While-Revalidate
//!
//! A fresh cached entry is returned at once and a refresh is queued behind
//! it. On a miss or an expired entry the network is awaited instead.

use tracing::debug;

use super::{store_quietly, ResponseSource, Served};
use crate::cache::{CacheStore, Lookup, PartitionKind};
use crate::cancel::CancellationToken;
use crate::error::{AgentError, Result};
use crate::intercept::InterceptedRequest;
use crate::network::Network;
use crate::tasks::RefreshQueue;

pub async fn stale_while_revalidate(
    store: &CacheStore,
    network: &dyn Network,
    refresh: &RefreshQueue,
    kind: PartitionKind,
    request: &InterceptedRequest,
) -> Result<Served> {
    let fallback = match store.lookup(kind, request).await {
        Lookup::Fresh(cached) => {
            refresh.enqueue(kind, request.clone());
            return Ok(Served::new(cached, ResponseSource::Cache));
        }
        Lookup::Stale(cached) => Some(cached),
        Lookup::Miss => None,
    };

    match network.fetch(request, &CancellationToken::new()).await {
        Ok(response) => {
            store_quietly(store, kind, request, &response).await;
            Ok(Served::new(response, ResponseSource::Network))
        }
        Err(e) => match fallback {
            Some(stale) => {
                debug!(key = %request.key(), error = %e, "serving stale asset");
                Ok(Served::new(stale, ResponseSource::Stale))
            }
            None => {
                debug!(key = %request.key(), error = %e, "asset unavailable");
                Err(AgentError::NetworkFailure("network error".to_string()))
            }
        },
    }
}
