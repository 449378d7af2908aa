// rest/routes/workspace.rs — file browser for the UI.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{workspace, AppContext};

pub async fn list_files(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let root = ctx.config.workspace_root.clone();
    let files = workspace::list_files(&root);
    Json(json!({
        "workspace": root.display().to_string(),
        "files": files,
    }))
}

#[derive(Deserialize)]
pub struct FileQuery {
    pub path: String,
}

pub async fn read_file(
    State(ctx): State<Arc<AppContext>>,
    Query(q): Query<FileQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let resolved = workspace::resolve(&ctx.config.workspace_root, &q.path).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    match tokio::fs::read_to_string(&resolved).await {
        Ok(content) => Ok(Json(json!({ "path": q.path, "content": content }))),
        Err(e) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

#[derive(Deserialize)]
pub struct SaveFileRequest {
    pub path: String,
    pub content: String,
}

pub async fn save_file(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<SaveFileRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let resolved = workspace::resolve(&ctx.config.workspace_root, &body.path).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    if let Some(parent) = resolved.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ));
        }
    }

    match tokio::fs::write(&resolved, &body.content).await {
        Ok(()) => Ok(Json(json!({ "saved": true, "path": body.path }))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}
