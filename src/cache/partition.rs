//! Partition Module
//!
//! A single named store: key → snapshot map plus its write-order index.

use std::collections::HashMap;

use crate::cache::{CacheStats, InsertionIndex, ResponseSnapshot};

// == Partition ==
/// One named, versioned cache store.
#[derive(Debug)]
pub struct Partition {
    /// Versioned name, e.g. `static-v3`
    name: String,
    /// Key → stored response
    entries: HashMap<String, ResponseSnapshot>,
    /// Write order, oldest first
    order: InsertionIndex,
    /// Lookup and write counters
    stats: CacheStats,
}

impl Partition {
    // == Constructor ==
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            order: InsertionIndex::new(),
            stats: CacheStats::new(),
        }
    }

    /// Rebuilds a partition from `(key, snapshot)` pairs listed oldest first.
    pub fn from_entries(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (String, ResponseSnapshot)>,
    ) -> Self {
        let mut partition = Self::new(name);
        for (key, snapshot) in entries {
            partition.insert(key, snapshot);
        }
        partition
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Get ==
    /// Returns the stored snapshot for a key.
    pub fn get(&self, key: &str) -> Option<&ResponseSnapshot> {
        self.entries.get(key)
    }

    // == Insert ==
    /// Stores a snapshot. The last write to a key wins and becomes the newest.
    pub fn insert(&mut self, key: String, snapshot: ResponseSnapshot) {
        self.order.record(&key);
        self.entries.insert(key, snapshot);
    }

    // == Remove ==
    /// Removes a key, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    // == Keys ==
    /// Lists keys oldest write first.
    pub fn keys(&self) -> Vec<String> {
        self.order.keys()
    }

    /// Lists `(key, snapshot)` pairs oldest write first.
    pub fn entries(&self) -> Vec<(String, ResponseSnapshot)> {
        self.order
            .keys()
            .into_iter()
            .filter_map(|key| self.entries.get(&key).cloned().map(|s| (key, s)))
            .collect()
    }

    // == Stats ==
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
