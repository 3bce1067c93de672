//! Response DTOs for the control API

use serde::Serialize;

use crate::cache::PartitionStats;
use crate::lifecycle::LifecycleState;

/// Response body for GET /__agent/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Entries across every partition
    pub total_entries: usize,
    /// Fresh hits / all lookups, across every partition
    pub hit_rate: f64,
    pub partitions: Vec<PartitionStats>,
}

impl StatsResponse {
    pub fn new(partitions: Vec<PartitionStats>) -> Self {
        let total_entries = partitions.iter().map(|p| p.entries).sum();
        let hits: u64 = partitions.iter().map(|p| p.counters.hits).sum();
        let lookups: u64 = partitions
            .iter()
            .map(|p| p.counters.hits + p.counters.stale_hits + p.counters.misses)
            .sum();
        let hit_rate = if lookups > 0 {
            hits as f64 / lookups as f64
        } else {
            0.0
        };

        Self {
            total_entries,
            hit_rate,
            partitions,
        }
    }
}

/// Response body for GET /__agent/health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub lifecycle: LifecycleState,
}

impl HealthResponse {
    pub fn healthy(lifecycle: LifecycleState) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            lifecycle,
        }
    }
}
