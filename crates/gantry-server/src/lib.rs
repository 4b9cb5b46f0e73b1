//! HTTP surface of the gantry tool gateway.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | Liveness |
//! | `GET /api/toolset[/{name}]` | Toolset manifest |
//! | `GET /api/tool/{name}` | Single tool manifest |
//! | `POST /api/tool/{name}/invoke` | Invoke a tool |
//! | `POST /mcp[/{toolset}]` | MCP JSON-RPC |
//!
//! [`run`] loads the configuration, optionally watches it for changes and
//! serves until Ctrl-C. With `stdio` set it speaks MCP over stdin/stdout
//! instead of binding a port.

pub mod api;
pub mod caller;
pub mod config;
pub mod error;
pub mod mcp;
pub mod reload;
pub mod state;

pub use config::{DEFAULT_TOOLS_FILE, LoggingFormat, ServerConfig};
pub use error::ServerError;
pub use state::AppState;

use axum::routing::get;
use axum::{Json, Router};
use gantry_core::{Registries, ResourceManager, SERVER_VERSION};
use gantry_mcp::McpHandler;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Builds the full router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api::routes())
        .merge(mcp::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": SERVER_VERSION,
    }))
}

/// Loads resources and serves them until shutdown.
pub async fn run(config: ServerConfig, registries: Arc<Registries>) -> Result<(), ServerError> {
    let set = config.load_resources(&registries).await?;
    info!(
        sources = set.sources.len(),
        auth_services = set.auth_services.len(),
        tools = set.tools.len(),
        toolsets = set.toolsets.len(),
        prompts = set.prompts.len(),
        "initialized resources"
    );
    let resources = Arc::new(ResourceManager::new(set));

    let _watcher = if config.disable_reload {
        None
    } else {
        Some(reload::watch(
            config.clone(),
            Arc::clone(&registries),
            Arc::clone(&resources),
        )?)
    };

    if config.stdio {
        let handler =
            McpHandler::new(Arc::clone(&resources)).with_invoke_timeout(config.invoke_timeout);
        handler.run_stdio().await?;
    } else {
        serve_http(&config, Arc::clone(&resources)).await?;
    }

    resources.snapshot().close().await;
    Ok(())
}

async fn serve_http(
    config: &ServerConfig,
    resources: Arc<ResourceManager>,
) -> Result<(), ServerError> {
    let state = Arc::new(AppState::new(resources, config.invoke_timeout));
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    info!("Server listening on {}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server");
}
