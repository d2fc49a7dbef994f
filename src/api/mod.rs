pub mod error;
pub mod handlers;
pub mod state;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::analytics::QueryEngine;

use state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(|| async { "ok" }))
        // Market metrics
        .route("/api/market-metrics", get(handlers::latest_metrics))
        .route("/api/market-metrics/history", get(handlers::metrics_history))
        .route("/api/market-metrics/summary", get(handlers::metrics_summary))
        // Gamma exposure
        .route("/api/gamma/by-strike", get(handlers::gamma_by_strike))
        .route("/api/gamma/by-expiry", get(handlers::gamma_by_expiry))
        .route("/api/gamma/highest", get(handlers::highest_gamma_strikes))
        .route("/api/gamma/levels", get(handlers::gamma_levels))
        .route("/api/gamma/summary", get(handlers::exposure_summary))
        // Chain
        .route("/api/options-chain", get(handlers::options_chain))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(host: &str, port: u16, engine: QueryEngine) -> Result<()> {
    let app = router(AppState::new(engine));

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    info!(%addr, "gexflow API listening");
    axum::serve(listener, app).await.context("running server")?;

    Ok(())
}
