//! Eviction Policy Engine
//!
//! Enforces `{max_entries, max_age_ms}` on a partition with two independent
//! sweeps: age first, then count. Each step (list, read, delete) takes the
//! partition lock on its own, so the sweeps are not atomic with respect to
//! each other or to concurrent writes. A write that lands mid-sweep may be
//! evicted early or survive one sweep past the bound; the next sweep
//! corrects it. This race is accepted.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::tagger::{self, Freshness};
use super::PartitionHandle;

// == Policy ==
/// Bounds for one partition. Zero disables a bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Maximum entry count (0 = unbounded)
    pub max_entries: usize,
    /// Maximum age in milliseconds (0 = no expiry)
    pub max_age_ms: u64,
}

impl Policy {
    pub fn new(max_entries: usize, max_age_ms: u64) -> Self {
        Self {
            max_entries,
            max_age_ms,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_entries == 0 && self.max_age_ms == 0
    }
}

// == Eviction Report ==
/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    /// Entries removed by the age sweep
    pub expired: usize,
    /// Entries removed by the count sweep
    pub overflow: usize,
    /// Entries kept because their capture marker could not be read
    pub unmarked: usize,
}

impl EvictionReport {
    pub fn removed(&self) -> usize {
        self.expired + self.overflow
    }
}

// == Sweep ==
/// Runs the age sweep then the count sweep on `partition`.
pub async fn sweep(partition: &PartitionHandle, policy: Policy, now_ms: u64) -> EvictionReport {
    let mut report = EvictionReport::default();
    if policy.is_unbounded() {
        return report;
    }

    if policy.max_age_ms > 0 {
        age_sweep(partition, policy.max_age_ms, now_ms, &mut report).await;
    }
    if policy.max_entries > 0 {
        count_sweep(partition, policy.max_entries, &mut report).await;
    }

    if report.unmarked > 0 {
        warn!(
            partition = partition.name(),
            unmarked = report.unmarked,
            "entries without a readable capture marker never expire by age"
        );
    }

    let removed = report.removed();
    if removed > 0 {
        partition.record(|s| s.record_evictions(removed)).await;
        debug!(
            partition = partition.name(),
            expired = report.expired,
            overflow = report.overflow,
            "eviction sweep removed entries"
        );
    }

    report
}

async fn age_sweep(partition: &PartitionHandle, max_age_ms: u64, now_ms: u64, report: &mut EvictionReport) {
    for key in partition.keys().await {
        // Deleted by a concurrent request since listing.
        let Some(snapshot) = partition.get(&key).await else {
            continue;
        };

        match tagger::freshness(&snapshot, max_age_ms, now_ms) {
            Freshness::Expired => {
                if partition.delete(&key).await {
                    report.expired += 1;
                }
            }
            Freshness::Unmarked => report.unmarked += 1,
            Freshness::Fresh => {}
        }
    }
}

async fn count_sweep(partition: &PartitionHandle, max_entries: usize, report: &mut EvictionReport) {
    let keys = partition.keys().await;
    if keys.len() <= max_entries {
        return;
    }

    let overflow = keys.len() - max_entries;
    for key in keys.iter().take(overflow) {
        if partition.delete(key).await {
            report.overflow += 1;
        }
    }
}
