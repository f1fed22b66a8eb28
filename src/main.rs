mod budget;
mod catalog;
mod config;
mod models;
mod planner;
mod routes;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use routes::{build_router, AppState};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{catalog::Catalog, config::AppConfig, planner::PlanGenerator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();
    let catalog = Catalog::load(config.catalog_path.as_deref()).context("loading plan catalog")?;
    if config.planner_seed.is_some() {
        tracing::info!("🎲 Restaurant draws seeded from PLANNER_SEED");
    }

    let state = AppState {
        generator: Arc::new(PlanGenerator::with_seed(Arc::new(catalog), config.planner_seed)),
        api_keys: Arc::new(config.api_keys.clone()),
    };
    tracing::info!("🔑 Provider keys configured: {:?}", state.api_keys.configured());

    let app = build_router(state);

    let addr = SocketAddr::new(config.bind_addr, config.port);
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
}
