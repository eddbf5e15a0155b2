//! srcview server entry point.
//!
//! Boots the HTTP service. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use srcview_client::{FetchClient, FetchConfig, SyntectProvider};
use srcview_core::{AppConfig, open_gateway};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod error;
mod pipeline;
mod routes;
#[cfg(test)]
mod testing;

use pipeline::{Pipeline, RenderSettings};
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let highlighter = Arc::new(SyntectProvider::new(
        vec![config.language.clone()],
        vec![config.theme.clone(), config.fragment_theme.clone()],
    ));
    let cache = open_gateway(&config).await?;
    let pipeline = Arc::new(Pipeline::new(fetcher, highlighter, cache, RenderSettings::from(&config)));

    let warm = pipeline.clone();
    tokio::spawn(async move {
        if let Err(e) = warm.warm_up().await {
            tracing::error!(error = %e, "highlighter failed to initialize");
        }
    });

    let sweeper = pipeline.clone();
    let purge_every = config.purge_interval();
    let max_entries = config.cache_max_entries;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(purge_every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sweeper.purge_cache(max_entries).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "cache purged"),
                Err(e) => tracing::warn!(error = %e, "cache purge failed"),
            }
        }
    });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, backend = ?config.cache_backend, "Starting srcview server");

    let app = routes::router(AppState { pipeline: pipeline.clone() });
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    pipeline.drain_stores().await;
    tracing::info!("srcview server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
