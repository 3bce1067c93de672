//! Lifecycle Controller
//!
//! Drives the agent through install and activate. Install precaches the
//! offline shell; activate removes partitions left over from older
//! generations, sweeps the asset and image partitions, and claims open pages.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{CacheStore, PartitionKind, ResponseSnapshot};
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::intercept::InterceptedRequest;
use crate::network::Network;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Idle,
    Installing,
    Installed,
    Activating,
    Activated,
}

/// Snapshot of the controller for the control API.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleStatus {
    pub state: LifecycleState,
    pub waiting_skipped: bool,
    pub pages_claimed: bool,
}

/// What an activation cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Partitions removed for belonging to another generation
    pub deleted_partitions: Vec<String>,
    /// Entries removed by the activation sweep
    pub evicted: usize,
}

#[derive(Debug)]
pub struct LifecycleController {
    config: Arc<Config>,
    store: Arc<CacheStore>,
    network: Arc<dyn Network>,
    state: RwLock<LifecycleState>,
    waiting_skipped: AtomicBool,
    pages_claimed: AtomicBool,
}

impl LifecycleController {
    pub fn new(config: Arc<Config>, store: Arc<CacheStore>, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            store,
            network,
            state: RwLock::new(LifecycleState::Idle),
            waiting_skipped: AtomicBool::new(false),
            pages_claimed: AtomicBool::new(false),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// True once activation has taken over open pages.
    pub fn controls_pages(&self) -> bool {
        self.pages_claimed.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> LifecycleStatus {
        LifecycleStatus {
            state: self.state().await,
            waiting_skipped: self.waiting_skipped.load(Ordering::SeqCst),
            pages_claimed: self.controls_pages(),
        }
    }

    // == Install ==
    /// Precaches the offline document and icons into the offline partition.
    ///
    /// Every asset is fetched before anything is written. If any fetch fails
    /// or returns an uncacheable response the partition is left untouched and
    /// the controller returns to `Idle`.
    pub async fn install(&self) -> Result<()> {
        self.transition(&[LifecycleState::Idle], LifecycleState::Installing)
            .await?;
        info!(generation = self.config.cache_generation, "installing");

        let fetched = match self.fetch_precache().await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(error = %e, "install failed");
                *self.state.write().await = LifecycleState::Idle;
                return Err(e);
            }
        };

        for kind in PartitionKind::ALL {
            self.store.open(kind).await;
        }
        for (request, response) in &fetched {
            self.store.put(PartitionKind::Offline, request, response).await?;
        }

        self.skip_waiting();
        *self.state.write().await = LifecycleState::Installed;
        info!(precached = fetched.len(), "installed");
        Ok(())
    }

    async fn fetch_precache(&self) -> Result<Vec<(InterceptedRequest, ResponseSnapshot)>> {
        let mut fetched = Vec::with_capacity(self.config.precache_assets.len());

        for asset in &self.config.precache_assets {
            let url = self.config.resolve(asset).ok_or_else(|| {
                AgentError::InvalidRequest(format!("cannot resolve precache asset {}", asset))
            })?;
            let request = InterceptedRequest::get(url);
            let response = self
                .network
                .fetch(&request, &CancellationToken::new())
                .await?;

            if !response.is_cacheable() {
                return Err(AgentError::WriteSkipped(format!(
                    "precache asset {} is not cacheable (status {}, sets cookie: {})",
                    asset,
                    response.status,
                    response.sets_cookie()
                )));
            }
            fetched.push((request, response));
        }

        Ok(fetched)
    }

    /// Asks to activate without waiting for the previous instance to let go.
    pub fn skip_waiting(&self) {
        self.waiting_skipped.store(true, Ordering::SeqCst);
    }

    // == Activate ==
    /// Deletes other-generation partitions, sweeps the asset and image
    /// partitions, then claims open pages.
    pub async fn activate(&self) -> Result<ActivationReport> {
        self.transition(&[LifecycleState::Installed], LifecycleState::Activating)
            .await?;

        let expected: HashSet<String> = PartitionKind::ALL
            .iter()
            .map(|kind| self.config.partition_name(*kind))
            .collect();

        let mut report = ActivationReport::default();
        for name in self.store.partitions().names().await {
            if !expected.contains(&name) && self.store.partitions().delete(&name).await {
                info!(partition = %name, "deleted old-generation partition");
                report.deleted_partitions.push(name);
            }
        }

        for kind in [PartitionKind::Asset, PartitionKind::Image] {
            report.evicted += self.store.evict(kind).await.removed();
        }

        self.claim();
        *self.state.write().await = LifecycleState::Activated;
        info!(
            deleted = report.deleted_partitions.len(),
            evicted = report.evicted,
            "activated"
        );
        Ok(report)
    }

    /// Takes over every open page without a reload.
    pub fn claim(&self) {
        self.pages_claimed.store(true, Ordering::SeqCst);
    }

    async fn transition(&self, from: &[LifecycleState], to: LifecycleState) -> Result<()> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(AgentError::InvalidRequest(format!(
                "cannot move from {:?} to {:?}",
                *state, to
            )));
        }
        *state = to;
        Ok(())
    }
}
