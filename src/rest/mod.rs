// rest/mod.rs — Public REST API server.
//
// Axum HTTP server, local only unless bind_address is widened.
//
// Endpoints:
//   GET    /                        (single-page UI)
//   GET    /health
//   POST   /execute-task
//   GET    /metrics                 (Prometheus text)
//   GET    /api/v1/memory
//   POST   /api/v1/memory/search
//   GET    /api/v1/memory/stats
//   DELETE /api/v1/memory
//   GET    /api/v1/workspace/files
//   GET    /api/v1/workspace/file
//   POST   /api/v1/workspace/file

pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // UI + health (no auth)
        .route("/", get(routes::ui::index))
        .route("/health", get(routes::health::health))
        // Task execution
        .route("/execute-task", post(routes::tasks::execute_task))
        // Metrics
        .route("/metrics", get(routes::metrics::get_metrics))
        // Memory
        .route(
            "/api/v1/memory",
            get(routes::memory::list_memory).delete(routes::memory::clear_memory),
        )
        .route("/api/v1/memory/search", post(routes::memory::search_memory))
        .route("/api/v1/memory/stats", get(routes::memory::memory_stats))
        // Workspace file browser
        .route(
            "/api/v1/workspace/files",
            get(routes::workspace::list_files),
        )
        .route(
            "/api/v1/workspace/file",
            get(routes::workspace::read_file).post(routes::workspace::save_file),
        )
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
