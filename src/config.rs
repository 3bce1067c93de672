//! Configuration Module
//!
//! Handles loading the agent configuration from environment variables.
//! The resulting value is immutable and shared as `Arc<Config>`.

use std::env;
use std::path::PathBuf;

use url::Url;

use crate::cache::{PartitionKind, Policy};

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Precached after the offline document unless `PRECACHE_ASSETS` is set.
const DEFAULT_ICONS: [&str; 2] = ["/icons/icon-192.png", "/icons/icon-512.png"];

/// Agent configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Origin the browser talks to (scheme, host and port)
    pub public_origin: String,
    /// Origin that same-origin requests are forwarded to
    pub upstream_origin: String,
    /// Partition generation; bumping it retires every older partition on activate
    pub cache_generation: u32,
    /// Path of the document served when a navigation cannot complete
    pub offline_document: String,
    /// Paths fetched into the offline partition at install time
    pub precache_assets: Vec<String>,
    /// Eviction bounds for the static-asset partition
    pub asset_policy: Policy,
    /// Eviction bounds for the image partition
    pub image_policy: Policy,
    /// Eviction bounds for the offline partition
    pub offline_policy: Policy,
    /// Hard wall-clock bound on navigation fetches
    pub navigation_timeout_ms: u64,
    /// Deadline for every upstream call, including background refreshes
    pub upstream_timeout_ms: u64,
    /// Same-origin path prefixes served cache-first with revalidation
    pub static_asset_prefixes: Vec<String>,
    /// Same-origin path prefixes that must never be persisted
    pub sensitive_path_prefixes: Vec<String>,
    /// Query keys (lowercase) marking a signed or authenticated URL
    pub sensitive_query_keys: Vec<String>,
    /// Optional JSON snapshot used to persist partitions across restarts
    pub snapshot_path: Option<PathBuf>,
    /// Largest request body accepted for forwarding
    pub max_body_bytes: usize,
    /// Notification title used when a push payload carries none
    pub push_default_title: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `PUBLIC_ORIGIN` - Browser-facing origin (default: http://localhost:3000)
    /// - `UPSTREAM_ORIGIN` - Marketplace origin (default: http://localhost:8080)
    /// - `CACHE_GENERATION` - Partition generation (default: 1)
    /// - `OFFLINE_DOCUMENT` - Offline fallback path (default: /offline.html)
    /// - `PRECACHE_ASSETS` - Comma separated precache paths, replacing the
    ///   default icons (the offline document is always included)
    /// - `ASSET_MAX_ENTRIES` / `ASSET_MAX_AGE_MS` - Static asset bounds
    /// - `IMAGE_MAX_ENTRIES` / `IMAGE_MAX_AGE_MS` - Image bounds
    /// - `NAVIGATION_TIMEOUT_MS` - Navigation bound (default: 4500)
    /// - `UPSTREAM_TIMEOUT_MS` - Upstream request deadline (default: 20000)
    /// - `CACHE_SNAPSHOT_PATH` - Snapshot file (default: unset)
    /// - `MAX_BODY_BYTES` - Forwarded body limit (default: 10 MiB)
    /// - `PUSH_DEFAULT_TITLE` - Fallback notification title
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let offline_document =
            env::var("OFFLINE_DOCUMENT").unwrap_or(defaults.offline_document.clone());
        let precache_assets = precache_list(
            &offline_document,
            env::var("PRECACHE_ASSETS").ok().as_deref(),
            &DEFAULT_ICONS,
        );

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            public_origin: env::var("PUBLIC_ORIGIN").unwrap_or(defaults.public_origin),
            upstream_origin: env::var("UPSTREAM_ORIGIN").unwrap_or(defaults.upstream_origin),
            cache_generation: parse_var("CACHE_GENERATION").unwrap_or(defaults.cache_generation),
            offline_document,
            precache_assets,
            asset_policy: Policy::new(
                parse_var("ASSET_MAX_ENTRIES").unwrap_or(defaults.asset_policy.max_entries),
                parse_var("ASSET_MAX_AGE_MS").unwrap_or(defaults.asset_policy.max_age_ms),
            ),
            image_policy: Policy::new(
                parse_var("IMAGE_MAX_ENTRIES").unwrap_or(defaults.image_policy.max_entries),
                parse_var("IMAGE_MAX_AGE_MS").unwrap_or(defaults.image_policy.max_age_ms),
            ),
            offline_policy: defaults.offline_policy,
            navigation_timeout_ms: parse_var("NAVIGATION_TIMEOUT_MS")
                .unwrap_or(defaults.navigation_timeout_ms),
            upstream_timeout_ms: parse_var("UPSTREAM_TIMEOUT_MS")
                .unwrap_or(defaults.upstream_timeout_ms),
            static_asset_prefixes: defaults.static_asset_prefixes,
            sensitive_path_prefixes: defaults.sensitive_path_prefixes,
            sensitive_query_keys: defaults.sensitive_query_keys,
            snapshot_path: env::var("CACHE_SNAPSHOT_PATH").ok().map(PathBuf::from),
            max_body_bytes: parse_var("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            push_default_title: env::var("PUSH_DEFAULT_TITLE")
                .unwrap_or(defaults.push_default_title),
        }
    }

    /// Returns the eviction bounds for a partition.
    pub fn policy(&self, kind: PartitionKind) -> Policy {
        match kind {
            PartitionKind::Offline => self.offline_policy,
            PartitionKind::Asset => self.asset_policy,
            PartitionKind::Image => self.image_policy,
        }
    }

    /// Resolves a path or URL against the public origin.
    pub fn resolve(&self, path: &str) -> Option<Url> {
        Url::parse(&self.public_origin).ok()?.join(path).ok()
    }

    /// Returns the versioned partition name for the current generation.
    pub fn partition_name(&self, kind: PartitionKind) -> String {
        format!("{}-v{}", kind.prefix(), self.cache_generation)
    }
}

/// Offline document first, then `list` if given, else `defaults`.
fn precache_list(offline_document: &str, list: Option<&str>, defaults: &[&str]) -> Vec<String> {
    let rest: Vec<&str> = match list {
        Some(list) => list.split(',').map(str::trim).collect(),
        None => defaults.to_vec(),
    };

    let mut assets = vec![offline_document.to_string()];
    for asset in rest {
        if !asset.is_empty() && !assets.iter().any(|a| a == asset) {
            assets.push(asset.to_string());
        }
    }
    assets
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            public_origin: "http://localhost:3000".to_string(),
            upstream_origin: "http://localhost:8080".to_string(),
            cache_generation: 1,
            offline_document: "/offline.html".to_string(),
            precache_assets: precache_list("/offline.html", None, &DEFAULT_ICONS),
            asset_policy: Policy::new(120, 7 * DAY_MS),
            image_policy: Policy::new(200, 30 * DAY_MS),
            offline_policy: Policy::unbounded(),
            navigation_timeout_ms: 4500,
            upstream_timeout_ms: 20_000,
            static_asset_prefixes: ["/_next/static/", "/static/", "/icons/", "/fonts/"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sensitive_path_prefixes: ["/api/", "/auth/", "/_next/data/"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sensitive_query_keys: [
                "token",
                "signature",
                "sig",
                "expires",
                "x-amz-signature",
                "x-amz-security-token",
                "x-goog-signature",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            snapshot_path: None,
            max_body_bytes: 10 * 1024 * 1024,
            push_default_title: "Marketplace".to_string(),
        }
    }
}
