//! HTTP request handlers

use super::types::{ErrorResponse, SuccessResponse, ToolsResponse};
use super::AppState;
use crate::tools::{ToolContext, ToolOutput};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tools", get(list_tools))
        .route("/api/conversations/:id/tools/:name", post(run_tool))
        .route("/api/conversations/:id/browser/close", post(close_browser))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Tools
// ============================================================

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.tools.definitions(),
    })
}

async fn run_tool(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    Json(input): Json<Value>,
) -> Result<Json<ToolOutput>, AppError> {
    let ctx = ToolContext::new(
        CancellationToken::new(),
        id.clone(),
        state.browser_sessions.clone(),
    );

    let output = state
        .tools
        .execute(&name, input, ctx)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Unknown tool: {name}")))?;

    if !output.success {
        tracing::info!(conversation_id = %id, tool = %name, error = %output.output, "Tool reported failure");
    }

    Ok(Json(output))
}

// ============================================================
// Browser sessions
// ============================================================

async fn close_browser(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.browser_sessions.kill_session(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(AppError::NotFound(format!(
            "No browser session for conversation: {id}"
        )))
    }
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("browser-lens ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub(crate) enum AppError {
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
