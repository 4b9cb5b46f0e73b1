//! Per-request caller information handed from a transport to the dispatcher.

use gantry_core::{AccessToken, CallerIdentity, ClaimsMap, Tool};
use std::collections::HashMap;

/// What the transport learned about the caller.
///
/// Claims are verified up front for every configured auth service. The
/// client-delegated credential depends on which header the called tool
/// reads, so raw headers are kept until the tool is known.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub claims: ClaimsMap,
    headers: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(claims: ClaimsMap) -> Self {
        Self {
            claims,
            headers: HashMap::new(),
        }
    }

    /// Records a request header. Names are case-insensitive.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Identity for a call to `tool`.
    pub fn caller_for(&self, tool: &dyn Tool) -> CallerIdentity {
        let access_token = self
            .header(tool.auth_token_header_name())
            .map(AccessToken::new)
            .unwrap_or_default();
        CallerIdentity {
            claims: self.claims.clone(),
            access_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_case_insensitive() {
        let ctx = RequestContext::default().with_header("Authorization", "Bearer abc");
        assert_eq!(ctx.header("authorization"), Some("Bearer abc"));
        assert_eq!(ctx.header("AUTHORIZATION"), Some("Bearer abc"));
        assert_eq!(ctx.header("x-other"), None);
    }
}
