//! Bearer token verification.
//!
//! Route handlers only see [`IdentityVerifier`]. The deployment picks one
//! backing at startup: [`JwtVerifier`] for tokens this server signs itself,
//! or [`JwksVerifier`](super::jwks::JwksVerifier) for tokens issued by an
//! external identity provider.

use super::{
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, Identity},
};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

/// Resolves a bearer token to the identity behind it
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a token
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Malformed, expired or wrongly signed token
    async fn authenticate(&self, token: &str) -> AuthResult<Identity>;
}

/// Verifier for HS256 access tokens signed with the server's own secret
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decode and validate the claims of a self-issued token
    pub fn verify(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let data = decode::<AccessTokenClaims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn authenticate(&self, token: &str) -> AuthResult<Identity> {
        let claims = self.verify(token).map_err(|e| {
            log::debug!("Rejected access token: {}", e);
            AuthError::InvalidToken
        })?;

        Ok(Identity {
            subject: claims.sub.to_string(),
            user_id: Some(claims.sub),
            email: None,
        })
    }
}
