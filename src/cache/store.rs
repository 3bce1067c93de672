//! Cache Store Module
//!
//! Accessor over the three versioned partitions. Stamps every write with a
//! capture time and runs an eviction sweep after it.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::eviction::{self, EvictionReport};
use crate::cache::tagger::{self, Freshness};
use crate::cache::{CacheStats, PartitionHandle, PartitionStore, ResponseSnapshot};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::intercept::InterceptedRequest;

// == Partition Kind ==
/// The content class a partition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Offline,
    Asset,
    Image,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [
        PartitionKind::Offline,
        PartitionKind::Asset,
        PartitionKind::Image,
    ];

    /// Name prefix before the generation suffix.
    pub fn prefix(&self) -> &'static str {
        match self {
            PartitionKind::Offline => "offline",
            PartitionKind::Asset => "static",
            PartitionKind::Image => "images",
        }
    }
}

// == Lookup ==
/// Result of reading a partition against its age bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Fresh(ResponseSnapshot),
    /// Past `max_age_ms`; usable only as a fallback
    Stale(ResponseSnapshot),
    Miss,
}

impl Lookup {
    /// The entry when fresh, otherwise `CacheMiss` or `StaleEntry` for `key`.
    pub fn into_fresh(self, key: &str) -> Result<ResponseSnapshot> {
        match self {
            Lookup::Fresh(r) => Ok(r),
            Lookup::Stale(_) => Err(AgentError::StaleEntry(key.to_string())),
            Lookup::Miss => Err(AgentError::CacheMiss(key.to_string())),
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }
}

/// Statistics for one partition.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStats {
    pub name: String,
    pub entries: usize,
    #[serde(flatten)]
    pub counters: CacheStats,
    pub hit_rate: f64,
}

// == Cache Store ==
/// Reads and writes cached responses by partition kind.
#[derive(Debug)]
pub struct CacheStore {
    partitions: PartitionStore,
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    // == Constructor ==
    pub fn new(config: Arc<Config>, clock: Arc<dyn Clock>) -> Self {
        Self::with_partitions(config, clock, PartitionStore::new())
    }

    /// Wraps an existing partition registry (e.g. one restored from a snapshot).
    pub fn with_partitions(config: Arc<Config>, clock: Arc<dyn Clock>, partitions: PartitionStore) -> Self {
        Self {
            partitions,
            config,
            clock,
        }
    }

    pub fn partitions(&self) -> &PartitionStore {
        &self.partitions
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Opens the current-generation partition for `kind`.
    pub async fn open(&self, kind: PartitionKind) -> PartitionHandle {
        self.partitions.open(&self.config.partition_name(kind)).await
    }

    // == Put ==
    /// Stores a cacheable response for a GET request, then sweeps the partition.
    ///
    /// Returns `WriteSkipped` when nothing was stored; callers treat that as non-fatal.
    pub async fn put(
        &self,
        kind: PartitionKind,
        request: &InterceptedRequest,
        response: &ResponseSnapshot,
    ) -> Result<EvictionReport> {
        let partition = self.open(kind).await;

        if !request.is_get() {
            return Err(AgentError::WriteSkipped(format!(
                "{} requests are not cached",
                request.method
            )));
        }

        if !response.is_cacheable() {
            partition.record(|s| s.record_skipped_write()).await;
            let reason = if response.sets_cookie() {
                "response sets a cookie".to_string()
            } else {
                format!("status {} is not cacheable", response.status)
            };
            return Err(AgentError::WriteSkipped(reason));
        }

        let now = self.now_ms();
        partition
            .put(request.key(), tagger::stamp(response, now))
            .await;
        partition.record(|s| s.record_write()).await;
        debug!(partition = partition.name(), key = %request.key(), "stored response");

        Ok(eviction::sweep(&partition, self.config.policy(kind), now).await)
    }

    // == Lookup ==
    /// Reads an entry and classifies it against the partition's age bound.
    pub async fn lookup(&self, kind: PartitionKind, request: &InterceptedRequest) -> Lookup {
        self.lookup_key(kind, &request.key()).await
    }

    /// Same as [`CacheStore::lookup`] for a precomputed key.
    pub async fn lookup_key(&self, kind: PartitionKind, key: &str) -> Lookup {
        let partition = self.open(kind).await;
        let max_age_ms = self.config.policy(kind).max_age_ms;

        let lookup = match partition.get(key).await {
            None => Lookup::Miss,
            Some(snapshot) => match tagger::freshness(&snapshot, max_age_ms, self.now_ms()) {
                Freshness::Expired => Lookup::Stale(snapshot),
                Freshness::Fresh | Freshness::Unmarked => Lookup::Fresh(snapshot),
            },
        };

        partition
            .record(|s| match &lookup {
                Lookup::Fresh(_) => s.record_hit(),
                Lookup::Stale(_) => s.record_stale_hit(),
                Lookup::Miss => s.record_miss(),
            })
            .await;
        lookup
    }

    // == Match ==
    /// Returns the stored entry regardless of age.
    pub async fn match_request(
        &self,
        kind: PartitionKind,
        request: &InterceptedRequest,
    ) -> Option<ResponseSnapshot> {
        self.match_key(kind, &request.key()).await
    }

    pub async fn match_key(&self, kind: PartitionKind, key: &str) -> Option<ResponseSnapshot> {
        self.open(kind).await.get(key).await
    }

    pub async fn delete(&self, kind: PartitionKind, request: &InterceptedRequest) -> bool {
        self.open(kind).await.delete(&request.key()).await
    }

    /// Keys oldest write first.
    pub async fn keys(&self, kind: PartitionKind) -> Vec<String> {
        self.open(kind).await.keys().await
    }

    // == Evict ==
    /// Runs an eviction sweep on the current-generation partition for `kind`.
    pub async fn evict(&self, kind: PartitionKind) -> EvictionReport {
        let partition = self.open(kind).await;
        eviction::sweep(&partition, self.config.policy(kind), self.now_ms()).await
    }

    // == Stats ==
    /// Statistics for every partition present, in name order.
    pub async fn stats(&self) -> Vec<PartitionStats> {
        let mut stats = Vec::new();
        for handle in self.partitions.handles().await {
            let counters = handle.stats().await;
            stats.push(PartitionStats {
                name: handle.name().to_string(),
                entries: handle.len().await,
                hit_rate: counters.hit_rate(),
                counters,
            });
        }
        stats
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{tagger::CAPTURE_HEADER, Policy};
    use crate::clock::ManualClock;
    use axum::http::{HeaderMap, Method};
    use bytes::Bytes;
    use url::Url;

    fn store_with(policy: Policy, clock: ManualClock) -> CacheStore {
        let config = Config {
            asset_policy: policy,
            ..Config::default()
        };
        CacheStore::new(Arc::new(config), Arc::new(clock))
    }

    fn get(path: &str) -> InterceptedRequest {
        InterceptedRequest::get(Url::parse(&format!("http://localhost:3000{}", path)).unwrap())
    }

    #[tokio::test]
    async fn test_put_then_match() {
        let store = store_with(Policy::unbounded(), ManualClock::new(5));
        let response = ResponseSnapshot::new(200, "body").with_header("content-type", "text/css");

        store.put(PartitionKind::Asset, &get("/a.css"), &response).await.unwrap();

        let stored = store.match_request(PartitionKind::Asset, &get("/a.css")).await.unwrap();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.body, "body");
        assert_eq!(stored.header("content-type"), Some("text/css"));
        assert_eq!(stored.header(CAPTURE_HEADER), Some("5"));
    }

    #[tokio::test]
    async fn test_put_skips_uncacheable() {
        let store = store_with(Policy::unbounded(), ManualClock::new(0));

        let result = store
            .put(PartitionKind::Asset, &get("/missing.js"), &ResponseSnapshot::new(404, "nope"))
            .await;

        assert!(matches!(result, Err(AgentError::WriteSkipped(_))));
        assert!(store.match_request(PartitionKind::Asset, &get("/missing.js")).await.is_none());
        let stats = store.open(PartitionKind::Asset).await.stats().await;
        assert_eq!(stats.skipped_writes, 1);
    }

    #[tokio::test]
    async fn test_put_skips_cookie_setting_response() {
        let store = store_with(Policy::unbounded(), ManualClock::new(0));
        let response = ResponseSnapshot::new(200, "css").with_header("set-cookie", "session=abc");

        let result = store.put(PartitionKind::Asset, &get("/a.css"), &response).await;

        assert!(matches!(result, Err(AgentError::WriteSkipped(_))));
        assert!(store.match_request(PartitionKind::Asset, &get("/a.css")).await.is_none());
    }

    #[tokio::test]
    async fn test_put_accepts_opaque() {
        let store = store_with(Policy::unbounded(), ManualClock::new(0));

        store
            .put(PartitionKind::Image, &get("/x.png"), &ResponseSnapshot::opaque("??"))
            .await
            .unwrap();
        assert!(store.match_request(PartitionKind::Image, &get("/x.png")).await.is_some());
    }

    #[tokio::test]
    async fn test_put_refuses_non_get() {
        let store = store_with(Policy::unbounded(), ManualClock::new(0));
        let request = InterceptedRequest::new(
            Method::PUT,
            Url::parse("http://localhost:3000/a.js").unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        );

        let result = store
            .put(PartitionKind::Asset, &request, &ResponseSnapshot::new(200, "x"))
            .await;
        assert!(matches!(result, Err(AgentError::WriteSkipped(_))));
        assert!(store.keys(PartitionKind::Asset).await.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_fresh_then_stale() {
        let clock = ManualClock::new(0);
        let store = store_with(Policy::new(0, 1000), clock.clone());
        store
            .put(PartitionKind::Asset, &get("/k1.js"), &ResponseSnapshot::new(200, "v"))
            .await
            .unwrap();

        clock.set(999);
        assert!(store.lookup(PartitionKind::Asset, &get("/k1.js")).await.is_fresh());

        clock.set(1001);
        let lookup = store.lookup(PartitionKind::Asset, &get("/k1.js")).await;
        assert!(matches!(lookup, Lookup::Stale(_)));
        assert!(store.match_request(PartitionKind::Asset, &get("/k1.js")).await.is_some());

        assert_eq!(store.lookup(PartitionKind::Asset, &get("/other.js")).await, Lookup::Miss);

        let stats = store.open(PartitionKind::Asset).await.stats().await;
        assert_eq!((stats.hits, stats.stale_hits, stats.misses), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_into_fresh_names_miss_and_stale() {
        let clock = ManualClock::new(0);
        let store = store_with(Policy::new(0, 1000), clock.clone());
        let key = get("/k1.js").key();
        store
            .put(PartitionKind::Asset, &get("/k1.js"), &ResponseSnapshot::new(200, "v"))
            .await
            .unwrap();

        let fresh = store.lookup_key(PartitionKind::Asset, &key).await.into_fresh(&key);
        assert_eq!(fresh.unwrap().body, "v");

        clock.set(1001);
        assert_eq!(
            store.lookup_key(PartitionKind::Asset, &key).await.into_fresh(&key),
            Err(AgentError::StaleEntry(key.clone()))
        );
        assert_eq!(
            Lookup::Miss.into_fresh("GET http://localhost:3000/none.js"),
            Err(AgentError::CacheMiss("GET http://localhost:3000/none.js".to_string()))
        );
    }

    #[tokio::test]
    async fn test_put_triggers_count_eviction() {
        let store = store_with(Policy::new(2, 0), ManualClock::new(0));
        for path in ["/k1.js", "/k2.js", "/k3.js"] {
            store
                .put(PartitionKind::Asset, &get(path), &ResponseSnapshot::new(200, path.to_string()))
                .await
                .unwrap();
        }

        assert!(store.match_request(PartitionKind::Asset, &get("/k1.js")).await.is_none());
        assert!(store.match_request(PartitionKind::Asset, &get("/k2.js")).await.is_some());
        assert!(store.match_request(PartitionKind::Asset, &get("/k3.js")).await.is_some());
    }

    #[tokio::test]
    async fn test_delete_and_stats() {
        let store = store_with(Policy::unbounded(), ManualClock::new(0));
        store
            .put(PartitionKind::Asset, &get("/a.js"), &ResponseSnapshot::new(200, "a"))
            .await
            .unwrap();

        assert!(store.delete(PartitionKind::Asset, &get("/a.js")).await);
        assert!(!store.delete(PartitionKind::Asset, &get("/a.js")).await);

        let stats = store.stats().await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "static-v1");
        assert_eq!(stats[0].entries, 0);
        assert_eq!(stats[0].counters.writes, 1);
    }
}
