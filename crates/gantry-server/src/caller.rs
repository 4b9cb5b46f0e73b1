//! Caller identity from request headers.

use axum::http::HeaderMap;
use gantry_core::ResourceManager;
use gantry_core::auth::verify_headers;
use gantry_mcp::RequestContext;

/// Verifies every configured auth service's `<name>_token` header and keeps
/// the raw headers for client-delegated credentials.
pub async fn request_context(resources: &ResourceManager, headers: &HeaderMap) -> RequestContext {
    let services = resources.get_auth_services();
    let claims = verify_headers(&services, |name| header_value(headers, name)).await;
    headers
        .iter()
        .fold(RequestContext::new(claims), |ctx, (name, value)| match value.to_str() {
            Ok(value) => ctx.with_header(name.as_str(), value),
            Err(_) => ctx,
        })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}
