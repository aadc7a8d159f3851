// =============================================================================
// StockViz — Main Entry Point
// =============================================================================
//
// A single-process dashboard service: fetch OHLC history for a ticker,
// compute MA/Bollinger/RSI overlays, and serve the interactive chart page
// plus the JSON API it runs on.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod chart;
mod chart_config;
mod export;
mod indicators;
mod market_data;
mod portfolio;
mod types;
mod yahoo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::chart_config::ChartConfig;
use crate::yahoo::client::DEFAULT_BASE_URL;
use crate::yahoo::YahooClient;

/// Where user selections are persisted between runs.
const CONFIG_PATH: &str = "chart_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        StockViz — Stock Market Visualizer               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path = PathBuf::from(CONFIG_PATH);
    let config = ChartConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        ChartConfig::default()
    });

    info!(
        ticker = %config.ticker,
        interval = %config.interval,
        show_ma = config.show_ma,
        show_rsi = config.show_rsi,
        show_boll = config.show_boll,
        "Dashboard settings"
    );

    // ── 2. Build provider client & shared state ──────────────────────────
    let provider_url =
        std::env::var("STOCKVIZ_PROVIDER_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let provider = YahooClient::new(provider_url);

    let state = Arc::new(AppState::new(config, provider, config_path.clone()));

    // ── 3. Serve the dashboard ───────────────────────────────────────────
    let bind_addr =
        std::env::var("STOCKVIZ_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Dashboard listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    if let Err(e) = state.chart_config.read().save(&config_path) {
        error!(error = %e, "Failed to save config on shutdown");
    }

    info!("StockViz shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    warn!("Shutdown signal received — stopping gracefully");
}
