//! # gantry-auth
//!
//! Auth service kinds for the gantry tool gateway.
//!
//! An auth service turns the bearer token a client sends in the
//! `<service>_token` header into verified claims. Tools can then require the
//! service before they run, and parameters can take their value from a claim.
//!
//! | Kind | Verifies |
//! |------|----------|
//! | `jwt` | Signed JWTs (HMAC secret, or RSA/EC/Ed25519 public key) |

pub mod error;
pub mod jwt;

use gantry_core::{ConfigError, Registries};

pub use error::JwtConfigError;
pub use jwt::{JwtAuthService, JwtAuthServiceConfig};

/// Registers every auth-service kind of this crate.
pub fn register(registries: &mut Registries) -> Result<(), ConfigError> {
    registries.auth_services.try_register(jwt::KIND, jwt::decode)
}
