//! Authentication error types.

use crate::db::timeouts::TimeoutError;
use std::time::Duration;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Unknown identifier or wrong password; deliberately indistinguishable
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Username already exists
    #[error("Username already exists")]
    UsernameTaken,

    /// Email already exists
    #[error("Email already exists")]
    EmailTaken,

    /// Invalid username format
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Invalid email format
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Name missing
    #[error("Name is required")]
    MissingName,

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Token missing, malformed, expired or signed by an unknown key
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Identity provider signing keys could not be fetched
    #[error("Failed to fetch identity provider keys: {0}")]
    KeyFetch(String),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and JWT errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::Timeout(_) | AuthError::HashingFailed => {
                "Internal server error".to_string()
            }
            AuthError::JwtError(_) | AuthError::InvalidToken | AuthError::KeyFetch(_) => {
                "Authentication required".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether the caller failed to prove who they are (maps to 401)
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::InvalidToken
                | AuthError::JwtError(_)
                | AuthError::KeyFetch(_)
        )
    }

    /// Whether the request collided with an existing account
    pub fn is_conflict(&self) -> bool {
        matches!(self, AuthError::UsernameTaken | AuthError::EmailTaken)
    }
}

impl From<TimeoutError> for AuthError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => AuthError::Timeout(d),
            TimeoutError::Database(e) => AuthError::Database(e),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
