//! CoinPeek background service
//!
//! Main entry point for the aggregation daemon

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coinpeek_aggregator::{HttpTransport, PriceAggregator, SnapshotCache};
use coinpeek_core::AppConfig;
use coinpeek_service::{JsonFileStore, LogDisplay, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting CoinPeek service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = AppConfig::default();
    if let Ok(url) = env::var("COINGECKO_URL") {
        config.endpoints.coingecko = url;
    }
    if let Ok(secs) = env::var("REFRESH_INTERVAL_SECS") {
        if let Ok(secs) = secs.parse::<u64>() {
            config.intervals.refresh_interval = Duration::from_secs(secs);
        }
    }
    let store_path = env::var("STORE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("coinpeek-store.json"));

    // Wire up the aggregation stack
    let store = Arc::new(JsonFileStore::new(store_path));
    let cache = Arc::new(SnapshotCache::new(
        store,
        config.intervals.min_request_interval,
        config.intervals.freshness_threshold,
    ));
    let transport = Arc::new(HttpTransport::new());
    let aggregator = Arc::new(PriceAggregator::new(transport, cache, config.clone()));

    let (orchestrator, _handle) =
        Orchestrator::new(aggregator, Arc::new(LogDisplay), config);

    // Setup shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C");
            }
            _ = terminate => {
                info!("Received termination signal");
            }
        }

        let _ = shutdown_tx.send(());
    });

    info!("Press Ctrl+C to shutdown");
    orchestrator.run(shutdown_rx).await;

    info!("Service shutdown complete");
    Ok(())
}
