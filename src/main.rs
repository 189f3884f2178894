// src/main.rs
mod api;
mod assistant;
mod cache;
mod config;
mod db;
mod error;
mod format;
mod insight;
mod market;
mod models;
mod portfolio;
mod sentiment;
mod sparkline;
mod state;
mod views;
mod watchlist;

use crate::config::{Config, StoreBackend};
use crate::db::{EntityStore, MemoryStore, ScyllaStore};
use crate::insight::HttpInsightClient;
use crate::state::AppState;
use env_logger::Builder;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task;
use tokio::time;

#[derive(Debug, Clone, Copy)]
enum RefreshJob {
    Market,
}

async fn worker(state: AppState, mut rx: mpsc::Receiver<RefreshJob>) {
    while let Some(job) = rx.recv().await {
        match job {
            RefreshJob::Market => match state.refresh_market().await {
                Ok(count) => info!("Refreshed market snapshot with {} coins.", count),
                Err(e) => error!("Error refreshing market snapshot: {}", e),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    Builder::new()
        .filter_level(config::log_level_from_env())
        .format_timestamp_secs()
        .init();
    let config = Config::from_env();

    info!(
        "Starting the crypto dashboard service (log level {})...",
        config.log_level
    );
    let store: Arc<dyn EntityStore> = match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory entity store.");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Scylla => match ScyllaStore::init(&config.scylla_node).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to initialize entity store: {}", e);
                return;
            }
        },
    };

    let insight = Arc::new(HttpInsightClient::new(
        config.insight_api_url.clone(),
        config.insight_api_key.clone(),
    ));
    let state = AppState::new(store, insight, &config.stale);

    let (tx, rx) = mpsc::channel(16);
    task::spawn(worker(state.clone(), rx));

    let refresh_interval = config.refresh_interval;
    task::spawn(async move {
        let mut ticker = time::interval(refresh_interval);
        loop {
            ticker.tick().await;
            if tx.send(RefreshJob::Market).await.is_err() {
                break;
            }
        }
    });

    let api = api::routes(state);

    info!("Server running on http://{}", config.bind_addr);
    warp::serve(api).run(config.bind_addr).await;
}
