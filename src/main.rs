mod aggregator;
mod api;
mod config;
mod error;
mod fetcher;
mod format;
mod publisher;
mod scheduler;
mod state;
mod types;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::CycleLatency;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::BinanceFetcher;
use crate::publisher::FilePublisher;
use crate::scheduler::Scheduler;
use crate::state::SnapshotStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        endpoints = cfg.ticker_api_urls.len(),
        interval_secs = cfg.refresh_interval.as_secs(),
        output_dir = %cfg.output_dir.display(),
        "Starting crypto tracker"
    );

    // --- Shared state ---
    let store = SnapshotStore::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(CycleLatency::new());

    // --- Scheduler loop (first cycle starts immediately) ---
    let scheduler = Scheduler::new(
        BinanceFetcher::new(&cfg)?,
        FilePublisher::new(&cfg)?,
        Arc::clone(&store),
        Arc::clone(&health),
        Arc::clone(&latency),
        cfg.refresh_interval,
    );
    let (stop_tx, stop_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(scheduler.run(stop_rx));

    // --- HTTP server ---
    let api_state = ApiState {
        store,
        health,
        latency,
        refresh_interval: cfg.refresh_interval,
        output_dir: cfg.output_dir.clone(),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Waiting for the current cycle to finish");
    let _ = stop_tx.send(true);
    if let Err(e) = loop_handle.await {
        warn!("Scheduler task ended abnormally: {e}");
    }

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping");
}
