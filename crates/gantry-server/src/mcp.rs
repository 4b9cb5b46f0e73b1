//! MCP over HTTP: one JSON-RPC message per POST.

use crate::api::ApiError;
use crate::caller::request_context;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use gantry_core::toolsets::DEFAULT_TOOLSET;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mcp", post(handle_default))
        .route("/mcp/{toolset}", post(handle_toolset))
}

async fn handle_default(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    dispatch(&state, DEFAULT_TOOLSET, &headers, &body).await
}

async fn handle_toolset(
    State(state): State<Arc<AppState>>,
    Path(toolset): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if state.resources.get_toolset(&toolset).is_none() {
        return ApiError::not_found(format!("toolset \"{toolset}\" does not exist")).into_response();
    }
    dispatch(&state, &toolset, &headers, &body).await
}

async fn dispatch(state: &AppState, toolset: &str, headers: &HeaderMap, body: &str) -> Response {
    let ctx = request_context(&state.resources, headers).await;
    match state.mcp.handle_message(body, toolset, &ctx).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
