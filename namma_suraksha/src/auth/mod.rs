//! Authentication module providing user registration, login and bearer
//! token verification.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - HS256 JWT access tokens (1-hour expiry by default)
//! - Pluggable token verification for an external identity provider
//!
//! ## Example
//!
//! ```no_run
//! use namma_suraksha::auth::{AuthManager, RegisterRequest};
//! use namma_suraksha::db::{Database, DatabaseConfig, PgUserRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::default()).await?;
//!     let auth = AuthManager::new(
//!         Arc::new(PgUserRepository::new(db.pool().clone())),
//!         "secret_pepper".to_string(),
//!         "jwt_secret".to_string(),
//!     );
//!
//!     let request = RegisterRequest {
//!         email: "asha@example.com".to_string(),
//!         username: "asha".to_string(),
//!         password: "SecurePass123".to_string(),
//!         name: "Asha".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let user = auth.register(request).await?;
//!     println!("Registered user: {}", user.username);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod jwks;
pub mod manager;
pub mod models;
pub mod verifier;

pub use errors::{AuthError, AuthResult};
pub use jwks::{JwksConfig, JwksVerifier};
pub use manager::{AuthManager, normalize_email};
pub use models::{
    AccessToken, AccessTokenClaims, Identity, LoginRequest, NewUser, RegisterRequest, User,
    UserCredentials, UserId,
};
pub use verifier::{IdentityVerifier, JwtVerifier};
