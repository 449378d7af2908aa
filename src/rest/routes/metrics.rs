// rest/routes/metrics.rs — GET /metrics (Prometheus text format).

use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;

use crate::AppContext;

pub async fn get_metrics(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        ctx.metrics.render_prometheus(),
    )
}
