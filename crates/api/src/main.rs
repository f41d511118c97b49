use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use holdfast_api::background::{expiry_sweeper, snapshot};
use holdfast_api::config::ServerConfig;
use holdfast_api::router::build_app_router;
use holdfast_api::state::AppState;
use holdfast_core::clock::SystemClock;
use holdfast_store::SnapshotStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Failed to load server configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        sweep_interval_ms = config.sweep_interval_ms,
        snapshot = ?config.snapshot_path,
        "Loaded server configuration"
    );

    // --- App state ---
    let state = AppState::new(config.clone(), Arc::new(SystemClock::new()));

    // --- Snapshot restore ---
    let store = config.snapshot_path.clone().map(SnapshotStore::new);
    if let Some(store) = &store {
        snapshot::restore(&state, store)
            .await
            .with_context(|| format!("Failed to restore snapshot {}", store.path().display()))?;
    }

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let sweeper_handle = tokio::spawn(expiry_sweeper::run(
        Arc::clone(&state.coordinator),
        config.sweep_interval(),
        cancel.clone(),
    ));

    let snapshot_handle = store.clone().map(|store| {
        tokio::spawn(snapshot::run(
            state.clone(),
            store,
            config.snapshot_interval(),
            cancel.clone(),
        ))
    });

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

    // --- Start server ---
    let host = config
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(shutdown_timeout, sweeper_handle)
        .await
        .is_err()
    {
        tracing::warn!("Expiry sweeper did not stop within the shutdown timeout");
    }
    if let Some(handle) = snapshot_handle {
        if tokio::time::timeout(shutdown_timeout, handle).await.is_err() {
            tracing::warn!("Snapshot job did not stop within the shutdown timeout");
        }
    }
    tracing::info!("Background tasks stopped");

    if let Some(store) = &store {
        match snapshot::persist(&state, store).await {
            Ok(()) => tracing::info!(path = %store.path().display(), "Final snapshot written"),
            Err(e) => tracing::error!(error = %e, "Final snapshot failed"),
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "holdfast_api=debug,holdfast_core=debug,holdfast_store=debug,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). If a handler cannot
/// be installed, that branch never fires and the other signal still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
