//! User profile handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    response::Response,
};
use namma_suraksha::auth::User;

use super::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::CurrentIdentity,
    reports::image_response,
};

/// Profile of the signed-in user
///
/// Tokens from an external identity provider whose email has no local
/// account resolve to `404`.
pub async fn me(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> ApiResult<Json<User>> {
    let user_id = identity
        .user_id
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(state.auth_manager.profile(user_id).await?))
}

/// Serve a stored profile photo
pub async fn get_photo(
    State(state): State<AppState>,
    filename: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let Path(filename) = filename?;
    let bytes = state.photos.retrieve(&filename).await?;
    Ok(image_response(&filename, bytes))
}
