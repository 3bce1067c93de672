//! Partition Storage Module
//!
//! Registry of named partitions. Partitions are opened lazily and
//! idempotently by name; each one sits behind its own lock so requests for
//! different partitions never contend.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheStats, Partition, ResponseSnapshot};

// == Partition Handle ==
/// Shared handle to one partition.
///
/// Every method takes the partition lock for a single step only.
#[derive(Debug, Clone)]
pub struct PartitionHandle {
    name: Arc<str>,
    inner: Arc<RwLock<Partition>>,
}

impl PartitionHandle {
    fn new(partition: Partition) -> Self {
        Self {
            name: Arc::from(partition.name()),
            inner: Arc::new(RwLock::new(partition)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &str) -> Option<ResponseSnapshot> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: String, snapshot: ResponseSnapshot) {
        self.inner.write().await.insert(key, snapshot);
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.inner.write().await.remove(key)
    }

    /// Keys oldest write first.
    pub async fn keys(&self) -> Vec<String> {
        self.inner.read().await.keys()
    }

    pub async fn entries(&self) -> Vec<(String, ResponseSnapshot)> {
        self.inner.read().await.entries()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats().clone()
    }

    /// Applies a counter update under the partition lock.
    pub async fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        update(self.inner.write().await.stats_mut());
    }
}

// == Partition Store ==
/// Named partitions, listed in name order.
#[derive(Debug, Default)]
pub struct PartitionStore {
    partitions: RwLock<BTreeMap<String, PartitionHandle>>,
}

impl PartitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Open ==
    /// Returns the partition called `name`, creating it if absent.
    pub async fn open(&self, name: &str) -> PartitionHandle {
        if let Some(handle) = self.partitions.read().await.get(name) {
            return handle.clone();
        }

        self.partitions
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| PartitionHandle::new(Partition::new(name)))
            .clone()
    }

    /// Installs a fully built partition, replacing any with the same name.
    pub async fn restore(&self, partition: Partition) {
        let handle = PartitionHandle::new(partition);
        self.partitions
            .write()
            .await
            .insert(handle.name().to_string(), handle);
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.partitions.read().await.contains_key(name)
    }

    pub async fn names(&self) -> Vec<String> {
        self.partitions.read().await.keys().cloned().collect()
    }

    pub async fn handles(&self) -> Vec<PartitionHandle> {
        self.partitions.read().await.values().cloned().collect()
    }

    // == Delete ==
    /// Drops a whole partition. Handles already held elsewhere become orphans.
    pub async fn delete(&self, name: &str) -> bool {
        self.partitions.write().await.remove(name).is_some()
    }
}
