//! Bounded Network with Offline Fallback
//!
//! Navigations go to the network under a hard deadline. When the deadline
//! passes the in-flight call is cancelled and dropped before the precached
//! offline document is served.

use std::time::Duration;

use tracing::debug;

use super::{ResponseSource, Served};
use crate::cache::{CacheStore, PartitionKind};
use crate::cancel::CancellationToken;
use crate::error::{AgentError, Result};
use crate::intercept::InterceptedRequest;
use crate::network::Network;

/// Fetches `request` within `timeout`, falling back to the entry stored under
/// `offline_key` in the offline partition.
///
/// Any HTTP response, whatever its status, is returned as is. Only a failed
/// or timed-out fetch uses the fallback; without one the original error is
/// returned.
pub async fn bounded_network(
    store: &CacheStore,
    network: &dyn Network,
    request: &InterceptedRequest,
    offline_key: Option<&str>,
    timeout: Duration,
) -> Result<Served> {
    let cancel = CancellationToken::new();
    let timer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    // Returning from select drops the fetch future, releasing the call.
    let result = tokio::select! {
        result = network.fetch(request, &cancel) => result,
        _ = cancel.cancelled() => Err(AgentError::TimeoutExpired(timeout.as_millis() as u64)),
    };
    timer.abort();

    let error = match result {
        Ok(response) => return Ok(Served::new(response, ResponseSource::Network)),
        Err(_) if cancel.is_cancelled() => AgentError::TimeoutExpired(timeout.as_millis() as u64),
        Err(e) => e,
    };

    let Some(key) = offline_key else {
        return Err(error);
    };

    match store.lookup_key(PartitionKind::Offline, key).await.into_fresh(key) {
        Ok(document) => {
            debug!(url = %request.url, error = %error, "serving offline document");
            Ok(Served::new(document, ResponseSource::Offline))
        }
        Err(unavailable) => {
            debug!(url = %request.url, error = %error, fallback = %unavailable, "no offline document");
            Err(error)
        }
    }
}
