pub mod handlers;
pub mod types;

use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::ResultStore;

pub struct AppState {
    pub config: Config,
    pub store: ResultStore,
    /// Serializes analysis runs: one upload is processed to completion
    /// before the next is accepted.
    pub analyze_lock: tokio::sync::Mutex<()>,
}

pub fn router(config: Config) -> Router {
    let body_limit = config.limits.max_upload_mb * 1024 * 1024;
    let state = Arc::new(AppState {
        config,
        store: ResultStore::new(),
        analyze_lock: tokio::sync::Mutex::new(()),
    });

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/analyze", post(handlers::analyze))
        .route("/api/v1/export/json", get(handlers::export_json))
        .route("/api/v1/graph", get(handlers::graph))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(config: Config) -> eyre::Result<()> {
    let addr = format!("{}:{}", config.api.host, config.api.port);
    let app = router(config);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
