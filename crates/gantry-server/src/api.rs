//! REST API: `/api/toolset`, `/api/tool/{name}` and tool invocation.

use crate::caller::request_context;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gantry_core::toolsets::{DEFAULT_TOOLSET, ToolsetManifest};
use gantry_core::{InvokeError, SERVER_VERSION, invoke_tool};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const UNAUTHORIZED_INVOCATION: &str =
    "tool invocation not authorized. Please make sure your specify correct auth headers";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/toolset", get(get_default_toolset))
        .route("/api/toolset/{name}", get(get_toolset))
        .route("/api/tool/{name}", get(get_tool))
        .route("/api/tool/{name}/invoke", post(invoke))
}

/// Error body `{"status": "<reason phrase>", "error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'a str,
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self.status.canonical_reason().unwrap_or("Unknown"),
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<InvokeError> for ApiError {
    fn from(err: InvokeError) -> Self {
        match &err {
            InvokeError::NotAuthorized => {
                Self::new(StatusCode::UNAUTHORIZED, UNAUTHORIZED_INVOCATION)
            }
            InvokeError::MissingClientToken { .. } => {
                Self::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            InvokeError::Params(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            InvokeError::Tool(e) => Self::new(
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    /// The tool result, JSON-encoded.
    pub result: String,
}

async fn get_default_toolset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ToolsetManifest>, ApiError> {
    toolset_manifest(&state, DEFAULT_TOOLSET)
}

async fn get_toolset(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ToolsetManifest>, ApiError> {
    toolset_manifest(&state, &name)
}

fn toolset_manifest(state: &AppState, name: &str) -> Result<Json<ToolsetManifest>, ApiError> {
    state
        .resources
        .get_toolset(name)
        .map(|toolset| Json(toolset.manifest.clone()))
        .ok_or_else(|| ApiError::not_found(format!("toolset \"{name}\" does not exist")))
}

async fn get_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ToolsetManifest>, ApiError> {
    let tool = state
        .resources
        .get_tool(&name)
        .ok_or_else(|| ApiError::not_found(format!("tool \"{name}\" does not exist")))?;
    Ok(Json(ToolsetManifest {
        server_version: SERVER_VERSION.to_string(),
        tools: BTreeMap::from([(name, tool.manifest())]),
    }))
}

async fn invoke(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InvokeResponse>, ApiError> {
    let tool = state
        .resources
        .get_tool(&name)
        .ok_or_else(|| ApiError::not_found(format!("tool \"{name}\" does not exist")))?;

    let args: Map<String, Value> = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("unable to parse request body: {e}"))
        })?
    };

    let caller = request_context(&state.resources, &headers)
        .await
        .caller_for(tool.as_ref());
    let value = invoke_tool(tool.as_ref(), &args, &caller, state.invoke_timeout).await?;

    let result = serde_json::to_string(&value).map_err(|e| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("unable to encode result: {e}"))
    })?;
    Ok(Json(InvokeResponse { result }))
}
