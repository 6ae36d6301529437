//! Verification of tokens issued by an external identity provider.
//!
//! Tokens are RS256 JWTs whose `kid` header names one of the provider's
//! published signing keys. Keys are fetched from the provider's JWKS
//! endpoint and cached, so a request only reaches the provider when it
//! presents a key id the cache has not seen, and then at most once per
//! [`MIN_REFRESH_INTERVAL`] whether or not the previous fetch succeeded.
//!
//! A token is linked to a local account only when the provider vouches for
//! its email (`email_verified: true`).

use super::{
    errors::{AuthError, AuthResult},
    models::Identity,
    verifier::IdentityVerifier,
};
use crate::db::UserRepository;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};

/// Firebase Authentication's published signing keys
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Lower bound between two key fetches
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Provider settings
#[derive(Debug, Clone)]
pub struct JwksConfig {
    pub jwks_url: String,
    /// Expected `iss` claim
    pub issuer: String,
    /// Expected `aud` claim
    pub audience: String,
}

impl JwksConfig {
    /// Settings for a Firebase project
    pub fn firebase(project_id: &str) -> Self {
        Self {
            jwks_url: FIREBASE_JWKS_URL.to_string(),
            issuer: format!("https://securetoken.google.com/{project_id}"),
            audience: project_id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
}

/// Verifier backed by an external provider's public keys
pub struct JwksVerifier {
    config: JwksConfig,
    client: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
    /// Time of the last fetch attempt; held across a fetch so only one runs
    last_attempt: Mutex<Option<Instant>>,
    users: Option<Arc<dyn UserRepository>>,
}

impl JwksVerifier {
    /// Create a verifier
    ///
    /// # Arguments
    ///
    /// * `config` - Provider endpoint and expected claims
    /// * `users` - When given, identities with a verified email are linked
    ///   to local accounts
    pub fn new(config: JwksConfig, users: Option<Arc<dyn UserRepository>>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            config,
            client,
            keys: RwLock::new(HashMap::new()),
            last_attempt: Mutex::new(None),
            users,
        }
    }

    /// Fetch the provider's key set and replace the cache
    ///
    /// Counts as an attempt for [`MIN_REFRESH_INTERVAL`] even when it fails.
    pub async fn refresh_keys(&self) -> AuthResult<usize> {
        let mut last_attempt = self.last_attempt.lock().await;
        *last_attempt = Some(Instant::now());
        self.fetch_keys().await
    }

    async fn fetch_keys(&self) -> AuthResult<usize> {
        let response = self
            .client
            .get(&self.config.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!(
                "key endpoint returned {}",
                response.status()
            )));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => log::warn!("Skipping unusable provider key {}: {}", kid, e),
            }
        }

        let count = keys.len();
        *self.keys.write().await = keys;
        log::info!("Loaded {} identity provider signing key(s)", count);

        Ok(count)
    }

    async fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        self.keys.read().await.get(kid).cloned()
    }

    async fn key_for(&self, kid: &str) -> AuthResult<DecodingKey> {
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        let mut last_attempt = self.last_attempt.lock().await;
        // A concurrent request may have refreshed while this one waited
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }
        if last_attempt.is_some_and(|at| at.elapsed() < MIN_REFRESH_INTERVAL) {
            return Err(AuthError::InvalidToken);
        }
        *last_attempt = Some(Instant::now());
        self.fetch_keys().await?;
        drop(last_attempt);

        self.cached_key(kid).await.ok_or(AuthError::InvalidToken)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation
    }
}

#[async_trait]
impl IdentityVerifier for JwksVerifier {
    async fn authenticate(&self, token: &str) -> AuthResult<Identity> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;

        let key = match self.key_for(&kid).await {
            Ok(key) => key,
            Err(AuthError::KeyFetch(reason)) => {
                log::error!("Cannot verify provider token: {}", reason);
                return Err(AuthError::InvalidToken);
            }
            Err(e) => return Err(e),
        };

        let claims = decode::<ProviderClaims>(token, &key, &self.validation())
            .map_err(|e| {
                log::debug!("Rejected provider token: {}", e);
                AuthError::InvalidToken
            })?
            .claims;

        // An unverified email says nothing about who owns the local account
        let email = claims.email.filter(|_| claims.email_verified == Some(true));

        let user_id = match (&self.users, &email) {
            (Some(users), Some(email)) => users
                .find_by_identifier(email)
                .await?
                .map(|credentials| credentials.user.id),
            _ => None,
        };

        Ok(Identity {
            subject: claims.sub,
            user_id,
            email,
        })
    }
}
