//! Error types for the auth crate.

use thiserror::Error;

/// Errors raised while building an auth service from its configuration.
#[derive(Debug, Error)]
pub enum JwtConfigError {
    /// The `algorithm` field names no known JWT algorithm.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The algorithm needs a key that was not configured.
    #[error("algorithm {algorithm} requires `{field}` to be set")]
    MissingKey {
        algorithm: String,
        field: &'static str,
    },

    /// The configured PEM key could not be parsed.
    #[error("failed to parse public key: {0}")]
    InvalidPublicKey(#[source] jsonwebtoken::errors::Error),
}
