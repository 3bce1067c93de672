//! Offline Agent - a request-intercepting caching agent
//!
//! Runs the agent as a same-origin proxy in front of the marketplace origin.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_agent::cache::{snapshot, CacheStore, PartitionStore};
use offline_agent::clock::SystemClock;
use offline_agent::{create_router, AppState, Config, HttpNetwork};

/// Main entry point for the offline agent.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Restore the cache snapshot, if configured
/// 4. Start the background refresh worker
/// 5. Install (precache the offline shell) and activate
/// 6. Serve until SIGINT/SIGTERM, then save the snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_agent=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting offline agent");

    let config = Arc::new(Config::from_env());
    info!(
        "Configuration loaded: origin={}, upstream={}, generation={}, port={}, navigation_timeout={}ms",
        config.public_origin,
        config.upstream_origin,
        config.cache_generation,
        config.server_port,
        config.navigation_timeout_ms
    );

    let partitions = PartitionStore::new();
    if let Some(path) = &config.snapshot_path {
        if let Err(e) = snapshot::load(&partitions, path).await {
            warn!(error = %e, "ignoring unreadable cache snapshot");
        }
    }
    let store = Arc::new(CacheStore::with_partitions(
        config.clone(),
        Arc::new(SystemClock),
        partitions,
    ));

    let network = Arc::new(HttpNetwork::new(&config).context("failed to set up upstream client")?);
    let (state, refresh_handle) = AppState::new(config.clone(), store.clone(), network);
    info!("Background refresh worker started");

    state
        .lifecycle
        .install()
        .await
        .context("install failed: could not precache the offline shell")?;
    state.lifecycle.activate().await.context("activate failed")?;

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Agent listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(refresh_handle))
        .await
        .context("server error")?;

    if let Some(path) = &config.snapshot_path {
        save_snapshot(&store, path).await;
    }

    info!("Agent shutdown complete");
    Ok(())
}

async fn save_snapshot(store: &CacheStore, path: &Path) {
    if let Err(e) = snapshot::save(store.partitions(), path).await {
        warn!(error = %e, "failed to save cache snapshot");
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the refresh worker and allows graceful shutdown.
async fn shutdown_signal(refresh_handle: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    refresh_handle.abort();
    warn!("Refresh worker aborted");
}
