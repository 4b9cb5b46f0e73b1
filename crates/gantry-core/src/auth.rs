//! Auth services and caller identity.
//!
//! An auth service verifies a bearer token presented in the
//! `<service>_token` header and yields the token's claims. Verified claims
//! feed parameter injection; verified service names feed tool authorization.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Claims decoded from one verified token.
pub type Claims = Map<String, Value>;

/// Verified claims keyed by auth-service name.
pub type ClaimsMap = HashMap<String, Claims>;

/// Errors raised while verifying a token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token is well-formed but expired or issued for someone else.
    #[error("token rejected: {0}")]
    Rejected(String),

    /// The `Authorization` header is not `Bearer <token>`.
    #[error("authorization header must be in the format 'Bearer <token>'")]
    MalformedBearer,
}

/// A configured identity provider.
#[async_trait]
pub trait AuthService: Send + Sync {
    fn kind(&self) -> &str;

    fn name(&self) -> &str;

    /// Verifies `token` and returns its claims.
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;

    /// Header that carries this service's token.
    fn header_name(&self) -> String {
        format!("{}_token", self.name())
    }
}

/// Decoded, kind-specific auth-service configuration.
#[async_trait]
pub trait AuthServiceConfig: Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;

    fn name(&self) -> &str;

    async fn initialize(&self) -> anyhow::Result<Arc<dyn AuthService>>;
}

/// Raw value of the client-delegated credential header.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessToken(Option<String>);

impl AccessToken {
    pub fn new(header: impl Into<String>) -> Self {
        Self(Some(header.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_present(&self) -> bool {
        self.0.as_deref().is_some_and(|v| !v.trim().is_empty())
    }

    pub fn raw(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Strips the `Bearer ` scheme and returns the token.
    pub fn parse_bearer_token(&self) -> Result<&str, AuthError> {
        let header = self.0.as_deref().ok_or(AuthError::MalformedBearer)?;
        let (scheme, token) = header.split_once(' ').ok_or(AuthError::MalformedBearer)?;
        let token = token.trim();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return Err(AuthError::MalformedBearer);
        }
        Ok(token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("AccessToken(<redacted>)"),
            None => f.write_str("AccessToken(None)"),
        }
    }
}

/// Identity established for one request.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    pub claims: ClaimsMap,
    pub access_token: AccessToken,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = token;
        self
    }

    pub fn with_claims(mut self, service: impl Into<String>, claims: Claims) -> Self {
        self.claims.insert(service.into(), claims);
        self
    }

    /// Names of the auth services whose token verified.
    pub fn verified_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.claims.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Verifies every service whose header is present.
///
/// `header` looks up a request header by name. A failed verification is
/// logged and the service is simply not counted as verified.
pub async fn verify_headers<'a, F>(
    services: impl IntoIterator<Item = &'a Arc<dyn AuthService>>,
    header: F,
) -> ClaimsMap
where
    F: Fn(&str) -> Option<String>,
{
    let mut claims = ClaimsMap::new();
    for service in services {
        let Some(token) = header(&service.header_name()) else {
            continue;
        };
        match service.verify(&token).await {
            Ok(verified) => {
                claims.insert(service.name().to_string(), verified);
            }
            Err(e) => {
                let auth_service = service.name();
                tracing::debug!(%auth_service, error = %e, "token verification failed");
            }
        }
    }
    claims
}
