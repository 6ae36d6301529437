//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult},
    models::{
        AccessToken, AccessTokenClaims, LoginRequest, NewUser, RegisterRequest, User, UserId,
    },
    verifier::JwtVerifier,
};
use crate::db::UserRepository;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;

/// Default access token lifetime
pub const DEFAULT_TOKEN_DURATION_SECS: i64 = 3600;

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    pepper: String,
    encoding_key: EncodingKey,
    verifier: JwtVerifier,
    access_token_duration: Duration,
    /// Hash checked when the identifier is unknown, so both failures cost the same
    dummy_hash: String,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - Credential store
    /// * `pepper` - Server-side pepper for password hashing
    /// * `jwt_secret` - Secret key for JWT signing
    ///
    /// # Returns
    ///
    /// * `AuthManager` - New authentication manager instance
    pub fn new(users: Arc<dyn UserRepository>, pepper: String, jwt_secret: String) -> Self {
        let mut manager = Self {
            users,
            pepper,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            verifier: JwtVerifier::new(&jwt_secret),
            access_token_duration: Duration::seconds(DEFAULT_TOKEN_DURATION_SECS),
            dummy_hash: String::new(),
        };
        manager.dummy_hash = manager
            .hash_password("namma-suraksha-timing-equaliser")
            .unwrap_or_default();
        manager
    }

    /// Override the access token lifetime
    pub fn with_token_duration(mut self, duration: Duration) -> Self {
        self.access_token_duration = duration;
        self
    }

    /// Verifier that accepts the tokens this manager issues
    pub fn verifier(&self) -> JwtVerifier {
        self.verifier.clone()
    }

    /// Register a new user
    ///
    /// # Arguments
    ///
    /// * `request` - Registration request with email, username, password, etc.
    ///
    /// # Returns
    ///
    /// * `AuthResult<User>` - Created user or error
    ///
    /// # Errors
    ///
    /// * `AuthError::UsernameTaken` - Username already exists
    /// * `AuthError::EmailTaken` - Email already exists
    /// * `AuthError::InvalidUsername` - Username format invalid
    /// * `AuthError::InvalidEmail` - Email format invalid
    /// * `AuthError::WeakPassword` - Password too weak
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        self.validate_registration(&request)?;

        let username = request.username.trim().to_string();
        let email = normalize_email(&request.email);
        let name = request.name.trim().to_string();

        // Hash password with Argon2id + pepper
        let password_hash = self.hash_password(&request.password)?;

        let phone = request
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        // Uniqueness is enforced by the store's constraints, not a prior lookup
        let id = self
            .users
            .create_user(NewUser {
                email,
                username,
                password_hash,
                name,
                phone,
                photo: request.photo,
            })
            .await?;

        log::info!("Registered user {}", id);

        self.users.find_by_id(id).await?.ok_or(AuthError::UserNotFound)
    }

    /// Check the registration fields without touching storage
    ///
    /// Callers that write files alongside the account run this first.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidUsername` - Username format invalid
    /// * `AuthError::InvalidEmail` - Email format invalid
    /// * `AuthError::MissingName` - Blank name
    /// * `AuthError::WeakPassword` - Password too weak
    pub fn validate_registration(&self, request: &RegisterRequest) -> AuthResult<()> {
        self.validate_username(request.username.trim())?;
        self.validate_email(&normalize_email(&request.email))?;
        if request.name.trim().is_empty() {
            return Err(AuthError::MissingName);
        }
        self.validate_password(&request.password)
    }

    /// Login a user
    ///
    /// # Arguments
    ///
    /// * `request` - Login request with email-or-username and password
    ///
    /// # Returns
    ///
    /// * `AuthResult<(User, AccessToken)>` - User and bearer token or error
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown identifier or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, AccessToken)> {
        let identifier = request.identifier.trim();

        let Some(credentials) = self.users.find_by_identifier(identifier).await? else {
            // Burn the same hashing work as a real check before failing
            let _ = self.verify_password(&request.password, &self.dummy_hash);
            return Err(AuthError::InvalidCredentials);
        };

        self.verify_password(&request.password, &credentials.password_hash)?;

        let token = self.issue_access_token(credentials.user.id, &credentials.user.username)?;

        Ok((credentials.user, token))
    }

    /// Look up the profile of an authenticated user
    pub async fn profile(&self, user_id: UserId) -> AuthResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Verify an access token
    ///
    /// # Arguments
    ///
    /// * `token` - JWT access token
    ///
    /// # Returns
    ///
    /// * `AuthResult<AccessTokenClaims>` - Decoded claims or error
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.verifier.verify(token)
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        // Add pepper to password
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
        let argon2 = Argon2::default();

        argon2
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Generate JWT access token
    fn issue_access_token(&self, user_id: UserId, username: &str) -> AuthResult<AccessToken> {
        let now = Utc::now();
        let expires_at = now + self.access_token_duration;
        let claims = AccessTokenClaims {
            sub: user_id,
            username: username.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;

        Ok(AccessToken { token, expires_at })
    }

    /// Validate username format
    fn validate_username(&self, username: &str) -> AuthResult<()> {
        let len = username.chars().count();
        if !(3..=30).contains(&len) {
            return Err(AuthError::InvalidUsername(
                "Username must be 3-30 characters".to_string(),
            ));
        }

        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '-')
        {
            return Err(AuthError::InvalidUsername(
                "Username can only contain letters, numbers, dots, hyphens and underscores"
                    .to_string(),
            ));
        }

        if username.contains('@') {
            return Err(AuthError::InvalidUsername(
                "Username cannot contain @".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate email shape; delivery is never attempted
    fn validate_email(&self, email: &str) -> AuthResult<()> {
        let mut parts = email.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AuthError::InvalidEmail(
                "Email must contain a single @".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidEmail(
                "Email must look like name@domain".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate password strength
    fn validate_password(&self, password: &str) -> AuthResult<()> {
        if password.chars().count() < 8 {
            return Err(AuthError::WeakPassword(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        Ok(())
    }
}

/// Emails are matched case-insensitively: stored and looked up lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
