// rest/routes/memory.rs — memory browsing, search, stats, clear.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppContext;

#[derive(Deserialize)]
pub struct MemoryQuery {
    pub limit: Option<usize>,
}

pub async fn list_memory(
    State(ctx): State<Arc<AppContext>>,
    Query(q): Query<MemoryQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let limit = q.limit.unwrap_or(10);
    match ctx.memory.recent(limit).await {
        Ok(records) => {
            let list: Vec<Value> = records
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "content": r.content,
                        "metadata": r.metadata,
                        "created_at": r.created_at,
                    })
                })
                .collect();
            Ok(Json(json!({ "memories": list })))
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub n_results: Option<usize>,
}

pub async fn search_memory(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<SearchRequest>,
) -> Json<Value> {
    ctx.metrics.inc_memory_searches();
    let n = body.n_results.unwrap_or(ctx.config.memory.search_results);

    // Search failures already degrade to an empty list inside the store.
    let matches = ctx.memory.search(&body.query, n).await;
    let list: Vec<Value> = matches
        .iter()
        .map(|m| {
            json!({
                "content": m.record.content,
                "metadata": m.record.metadata,
                "score": m.score,
            })
        })
        .collect();
    Json(json!({ "matches": list }))
}

pub async fn memory_stats(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match ctx.memory.stats().await {
        Ok(stats) => Ok(Json(json!({
            "total_memories": stats.total,
            "last_updated": stats.last_updated,
        }))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

pub async fn clear_memory(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match ctx.memory.clear().await {
        Ok(()) => Ok(Json(json!({ "cleared": true }))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}
