//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// Public user profile. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub name: String,
    pub phone: Option<String>,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user together with the stored hash, used only to check a login
#[derive(Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("user", &self.user)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// User registration request
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    /// Name of an already stored profile photo
    pub photo: Option<String>,
}

/// A validated user ready for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub photo: Option<String>,
}

/// User login request
#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Email address or username
    pub identifier: String,
    pub password: String,
}

/// JWT claims for access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,           // User ID
    pub username: String,
    pub exp: i64,              // Expiration timestamp
    pub iat: i64,              // Issued at timestamp
}

/// A signed bearer token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Who made a request, as established by an [`IdentityVerifier`](super::IdentityVerifier)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Token subject (local user id, or the provider's uid)
    pub subject: String,
    /// Local account, when the subject maps to one
    pub user_id: Option<UserId>,
    pub email: Option<String>,
}
