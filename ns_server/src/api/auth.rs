//! Authentication API handlers.
//!
//! This module provides HTTP REST endpoints for user authentication:
//! - Registration with email, username, password, name and an optional profile photo
//! - Login with email-or-username and password, returning a bearer token
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:5000/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "asha@example.org", "username": "asha", "password": "correct horse", "name": "Asha"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:5000/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"emailOrUsername": "asha", "password": "correct horse"}'
//! ```

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use namma_suraksha::{
    auth::{LoginRequest, RegisterRequest, User, UserId},
    evidence::StagedImages,
};
use serde::{Deserialize, Serialize};

use super::{
    AppState,
    error::ApiResult,
    forms::RegisterForm,
    request_id::RequestId,
};
use crate::{logging::log_security_event, metrics};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[serde(alias = "email", alias = "username")]
    pub email_or_username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub id: UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Register a new user account.
///
/// Accepts JSON or `multipart/form-data`; the multipart form may carry a
/// `photo` file part, stored as the profile photo.
///
/// # Request Body
///
/// ```json
/// {
///   "email": "asha@example.org",
///   "username": "asha",
///   "password": "correct horse",
///   "name": "Asha",
///   "phone": "9845012345"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{"message": "User registered successfully", "id": 7}`
///
/// # Errors
///
/// - `400 Bad Request`: Email or username taken, invalid field, unsupported photo
/// - `500 Internal Server Error`: Storage failure
pub async fn register(
    State(state): State<AppState>,
    RegisterForm(fields): RegisterForm,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let mut request = RegisterRequest {
        email: fields.email,
        username: fields.username,
        password: fields.password,
        name: fields.name,
        phone: fields.phone,
        photo: None,
    };
    // Bad fields are rejected before the photo reaches disk
    state.auth_manager.validate_registration(&request)?;

    let mut staged = StagedImages::new(state.photos.clone());
    if let Some(photo) = fields.photo {
        staged.stage(photo).await?;
    }
    request.photo = staged.filenames().first().cloned();

    match state.auth_manager.register(request).await {
        Ok(user) => {
            staged.commit();
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: "User registered successfully",
                    id: user.id,
                }),
            ))
        }
        Err(e) => {
            staged.rollback().await;
            Err(e.into())
        }
    }
}

/// Authenticate a user and issue an access token.
///
/// # Request Body
///
/// ```json
/// { "emailOrUsername": "asha", "password": "correct horse" }
/// ```
///
/// `email` and `username` are accepted as aliases for `emailOrUsername`.
///
/// # Response
///
/// `200 OK` with `{"message": "Login successful", "token": "...", "expiresAt": "...", "user": {...}}`
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown account or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let identifier = payload.email_or_username.trim().to_string();

    let result = state
        .auth_manager
        .login(LoginRequest {
            identifier: identifier.clone(),
            password: payload.password,
        })
        .await;

    match result {
        Ok((user, token)) => {
            metrics::login_attempts_total(true);
            tracing::info!(user_id = user.id, "User logged in");
            Ok(Json(LoginResponse {
                message: "Login successful",
                token: token.token,
                expires_at: token.expires_at,
                user,
            }))
        }
        Err(e) => {
            metrics::login_attempts_total(false);
            if e.is_unauthenticated() {
                log_security_event(
                    "failed_login",
                    Some(&identifier),
                    Some(request_id.as_str()),
                    "Invalid credentials",
                );
            }
            Err(e.into())
        }
    }
}
