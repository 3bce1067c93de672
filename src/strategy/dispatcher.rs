//! Strategy Dispatcher
//!
//! Routes each intercepted request to the strategy its classification calls
//! for. Requests the agent does not handle are forwarded without touching the
//! cache.

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use tracing::debug;

use super::{
    bounded_network, cache_first, stale_while_revalidate, ResponseSource, Served, Strategy,
};
use crate::cache::{CacheStore, PartitionKind};
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::Result;
use crate::intercept::{request_key, Classification, InterceptedRequest, RequestClassifier};
use crate::network::Network;
use crate::tasks::RefreshQueue;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    classifier: RequestClassifier,
    store: Arc<CacheStore>,
    network: Arc<dyn Network>,
    refresh: RefreshQueue,
    offline_key: Option<String>,
    navigation_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        config: &Config,
        store: Arc<CacheStore>,
        network: Arc<dyn Network>,
        refresh: RefreshQueue,
    ) -> Self {
        let offline_key = config
            .resolve(&config.offline_document)
            .map(|url| request_key(&Method::GET, &url));

        Self {
            classifier: RequestClassifier::new(config),
            store,
            network,
            refresh,
            offline_key,
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
        }
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Classification {
        self.classifier.classify(request)
    }

    // == Handle ==
    /// Answers a request with the strategy chosen for its classification.
    pub async fn handle(&self, request: &InterceptedRequest) -> Result<Served> {
        let classification = self.classify(request);
        let strategy = Strategy::for_classification(classification);
        debug!(
            method = %request.method,
            url = %request.url,
            ?classification,
            ?strategy,
            "dispatching request"
        );

        match strategy {
            Strategy::StaleWhileRevalidate => {
                stale_while_revalidate(
                    &self.store,
                    self.network.as_ref(),
                    &self.refresh,
                    PartitionKind::Asset,
                    request,
                )
                .await
            }
            Strategy::CacheFirst => {
                cache_first(&self.store, self.network.as_ref(), PartitionKind::Image, request).await
            }
            Strategy::BoundedNetwork => {
                bounded_network(
                    &self.store,
                    self.network.as_ref(),
                    request,
                    self.offline_key.as_deref(),
                    self.navigation_timeout,
                )
                .await
            }
            Strategy::Passthrough => self.passthrough(request).await,
        }
    }

    /// Forwards a request untouched. Nothing is read from or written to the cache.
    pub async fn passthrough(&self, request: &InterceptedRequest) -> Result<Served> {
        let response = self.network.fetch(request, &CancellationToken::new()).await?;
        Ok(Served::new(response, ResponseSource::Passthrough))
    }
}
