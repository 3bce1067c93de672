//! Background Refresh Task
//!
//! Worker that revalidates cached responses after they have already been
//! served. Jobs are fire-and-forget: a failure is logged and dropped, never
//! reported to the request that queued it. At most one refresh per key is in
//! flight; jobs for a key already being refreshed are dropped.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheStore, PartitionKind};
use crate::cancel::CancellationToken;
use crate::intercept::InterceptedRequest;
use crate::network::Network;

/// One pending revalidation.
#[derive(Debug)]
pub struct RefreshJob {
    pub kind: PartitionKind,
    pub request: InterceptedRequest,
}

/// Sending side of the refresh queue.
#[derive(Debug, Clone)]
pub struct RefreshQueue {
    sender: mpsc::UnboundedSender<RefreshJob>,
}

impl RefreshQueue {
    /// Queues a refresh. Never blocks; a stopped worker just drops the job.
    pub fn enqueue(&self, kind: PartitionKind, request: InterceptedRequest) {
        let key = request.key();
        if self.sender.send(RefreshJob { kind, request }).is_err() {
            debug!(key = %key, "refresh worker stopped, dropping refresh");
        }
    }
}

/// Spawns the worker that drains the refresh queue.
///
/// Each job runs on its own task so a hung upstream cannot hold up later
/// jobs. The worker exits once every [`RefreshQueue`] clone is dropped.
///
/// # Returns
/// The queue handle and a JoinHandle that can be aborted during shutdown.
pub fn spawn_refresh_worker(
    store: Arc<CacheStore>,
    network: Arc<dyn Network>,
) -> (RefreshQueue, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<RefreshJob>();
    let in_flight: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));

    let handle = tokio::spawn(async move {
        info!("Starting background refresh worker");

        while let Some(job) = receiver.recv().await {
            let key = job.request.key();
            if !in_flight.lock().await.insert(key.clone()) {
                debug!(key = %key, "refresh already in flight");
                continue;
            }

            let store = store.clone();
            let network = network.clone();
            let in_flight = in_flight.clone();
            tokio::spawn(async move {
                refresh(&store, network.as_ref(), job).await;
                in_flight.lock().await.remove(&key);
            });
        }

        debug!("refresh queue closed");
    });

    (RefreshQueue { sender }, handle)
}

async fn refresh(store: &CacheStore, network: &dyn Network, job: RefreshJob) {
    let key = job.request.key();

    match network.fetch(&job.request, &CancellationToken::new()).await {
        Ok(response) => match store.put(job.kind, &job.request, &response).await {
            Ok(_) => debug!(key = %key, "background refresh stored"),
            Err(e) => debug!(key = %key, error = %e, "background refresh not stored"),
        },
        Err(e) => debug!(key = %key, error = %e, "background refresh failed"),
    }
}
