//! The `jwt` auth-service kind.
//!
//! ```yaml
//! authServices:
//!   my-jwt:
//!     kind: jwt
//!     algorithm: HS256
//!     secret: ${JWT_SECRET}
//!     issuer: https://issuer.example.com
//!     audience: gantry
//! ```
//!
//! RSA, EC and Ed25519 algorithms take a PEM-encoded `publicKey` instead of
//! `secret`. Expiry (`exp`) is always enforced.

use crate::error::JwtConfigError;
use async_trait::async_trait;
use gantry_core::auth::{AuthError, AuthService, AuthServiceConfig, Claims};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

pub const KIND: &str = "jwt";

/// Factory registered for [`KIND`].
pub fn decode(
    name: &str,
    value: serde_yaml::Value,
) -> Result<Box<dyn AuthServiceConfig>, serde_yaml::Error> {
    let mut config: JwtAuthServiceConfig = serde_yaml::from_value(value)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JwtAuthServiceConfig {
    #[serde(skip)]
    pub name: String,

    /// JWT algorithm, e.g. `HS256`, `RS256`, `ES256`.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Shared secret for HMAC algorithms.
    #[serde(default)]
    pub secret: Option<String>,

    /// PEM public key for asymmetric algorithms.
    #[serde(default)]
    pub public_key: Option<String>,

    #[serde(default)]
    pub issuer: Option<String>,

    #[serde(default)]
    pub audience: Option<String>,

    /// Clock skew tolerated on `exp`/`nbf`, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_leeway() -> u64 {
    60
}

impl std::fmt::Debug for JwtAuthServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthServiceConfig")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl JwtAuthServiceConfig {
    fn decoding_key(&self, algorithm: Algorithm) -> Result<DecodingKey, JwtConfigError> {
        let missing = |field| JwtConfigError::MissingKey {
            algorithm: self.algorithm.clone(),
            field,
        };
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                let secret = self.secret.as_deref().ok_or_else(|| missing("secret"))?;
                Ok(DecodingKey::from_secret(secret.as_bytes()))
            }
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => {
                let pem = self.public_key.as_deref().ok_or_else(|| missing("publicKey"))?;
                DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(JwtConfigError::InvalidPublicKey)
            }
            Algorithm::ES256 | Algorithm::ES384 => {
                let pem = self.public_key.as_deref().ok_or_else(|| missing("publicKey"))?;
                DecodingKey::from_ec_pem(pem.as_bytes()).map_err(JwtConfigError::InvalidPublicKey)
            }
            Algorithm::EdDSA => {
                let pem = self.public_key.as_deref().ok_or_else(|| missing("publicKey"))?;
                DecodingKey::from_ed_pem(pem.as_bytes()).map_err(JwtConfigError::InvalidPublicKey)
            }
        }
    }

    pub fn build(&self) -> Result<JwtAuthService, JwtConfigError> {
        let algorithm = Algorithm::from_str(&self.algorithm)
            .map_err(|_| JwtConfigError::UnsupportedAlgorithm(self.algorithm.clone()))?;
        let key = self.decoding_key(algorithm)?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway_secs;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(JwtAuthService {
            name: self.name.clone(),
            key,
            validation,
        })
    }
}

#[async_trait]
impl AuthServiceConfig for JwtAuthServiceConfig {
    fn kind(&self) -> &str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> anyhow::Result<Arc<dyn AuthService>> {
        Ok(Arc::new(self.build()?))
    }
}

/// Verifies JWTs against one key.
pub struct JwtAuthService {
    name: String,
    key: DecodingKey,
    validation: Validation,
}

#[async_trait]
impl AuthService for JwtAuthService {
    fn kind(&self) -> &str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience => AuthError::Rejected(e.to_string()),
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        tracing::debug!(auth_service = %self.name, "verified token");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn config(yaml: &str) -> JwtAuthServiceConfig {
        let mut config: JwtAuthServiceConfig = serde_yaml::from_str(yaml).unwrap();
        config.name = "my-jwt".into();
        config
    }

    fn token(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[tokio::test]
    async fn test_verify_valid_token() {
        let service = config("secret: test-secret\n").build().unwrap();
        let claims = json!({"sub": "u1", "email": "alice@example.com", "exp": in_one_hour()});
        let claims = service.verify(&token(claims)).await.unwrap();
        assert_eq!(claims["email"], "alice@example.com");
        assert_eq!(service.header_name(), "my-jwt_token");
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let service = config("secret: test-secret\n").build().unwrap();
        let expired = chrono::Utc::now().timestamp() - 3600;
        let err = service
            .verify(&token(json!({"sub": "u1", "exp": expired})))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let service = config("secret: other-secret\n").build().unwrap();
        let err = service
            .verify(&token(json!({"sub": "u1", "exp": in_one_hour()})))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_issuer_checked() {
        let service = config("secret: test-secret\nissuer: https://good.example.com\n")
            .build()
            .unwrap();
        let err = service
            .verify(&token(json!({"iss": "https://evil.example.com", "exp": in_one_hour()})))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));

        let ok = service
            .verify(&token(json!({"iss": "https://good.example.com", "exp": in_one_hour()})))
            .await;
        assert!(ok.is_ok());
    }

    #[test]
    fn test_missing_secret() {
        let err = config("algorithm: HS512\n").build().err().unwrap();
        assert_eq!(err.to_string(), "algorithm HS512 requires `secret` to be set");
    }

    #[test]
    fn test_unsupported_algorithm() {
        let err = config("algorithm: NONE\nsecret: x\n").build().err().unwrap();
        assert!(matches!(err, JwtConfigError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn test_unknown_field() {
        let value: serde_yaml::Value = serde_yaml::from_str("secret: x\nfoo: bar\n").unwrap();
        assert!(decode("my-jwt", value).is_err());
    }
}
