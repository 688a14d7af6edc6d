// =============================================================================
// Nifty Pulse: Main Entry Point
// =============================================================================
//
// Default: run one refresh cycle, print the dashboard, exit.
// `serve = true` (or PULSE_SERVE=1): refresh on an interval and expose the
// latest snapshot over REST until Ctrl+C.
//
// Everything runs on a single-threaded runtime; the three fetches inside a
// cycle are awaited one after another.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod dashboard;
mod error;
mod market_data;
mod pipeline;
mod render;
mod runtime_config;
mod sentiment;
mod strategy;
mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::render::RenderContext;
use crate::runtime_config::RuntimeConfig;

const CONFIG_PATH: &str = "pulse_config.json";

fn load_config() -> RuntimeConfig {
    let path = Path::new(CONFIG_PATH);

    let mut config = if path.exists() {
        RuntimeConfig::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            RuntimeConfig::default()
        })
    } else {
        let config = RuntimeConfig::default();
        if let Err(e) = config.save(path) {
            warn!(error = %e, "Failed to write default config");
        }
        config
    };

    config.apply_overrides(|name| std::env::var(name).ok());
    config
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config();
    info!(
        index = %config.index_symbol,
        vix = %config.vix_symbol,
        option_symbol = %config.option_symbol,
        serve = config.serve,
        "Nifty Pulse starting"
    );

    // ── 2. One-shot mode ─────────────────────────────────────────────────
    if !config.serve {
        let snapshot = pipeline::run_cycle(&config).await;
        let ctx = RenderContext::from_config(&config);
        print!("{}", render::render_text(&snapshot, &ctx));
        return Ok(());
    }

    // ── 3. Serve mode: shared state + refresh loop ───────────────────────
    let bind_addr = config.bind_addr.clone();
    let refresh_secs = config.refresh_interval_secs.max(1);
    let state = Arc::new(AppState::new(config));

    let refresh_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(refresh_secs));
        loop {
            interval.tick().await;
            refresh_state.refresh().await;
        }
    });

    // ── 4. API server ────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            warn!("Shutdown signal received, stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("Nifty Pulse shut down complete.");
    Ok(())
}
