// rest/routes/tasks.rs — POST /execute-task.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppContext;

#[derive(Deserialize)]
pub struct ExecuteTaskRequest {
    pub task: String,
    #[serde(default)]
    pub workspace_path: Option<String>,
}

/// Run a coding task and return `{result, logs}`.
///
/// Agent-level failures never surface as HTTP errors: the agent stringifies
/// them into `result`. Only a malformed request gets a 4xx.
pub async fn execute_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<ExecuteTaskRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if body.task.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "task must not be empty" })),
        ));
    }

    let outcome = ctx
        .agent
        .run_task(&body.task, body.workspace_path.as_deref())
        .await;

    Ok(Json(json!({
        "result": outcome.result,
        "logs": outcome.logs,
    })))
}
