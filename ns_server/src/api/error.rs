//! HTTP error mapping.
//!
//! Every handler returns [`ApiError`] on failure. Library errors convert into
//! it through `From`, so handlers propagate with `?` and the status code and
//! JSON body are decided in one place:
//!
//! ```json
//! { "message": "latitude must be between -90 and 90, got 91", "field": "latitude" }
//! ```

use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use namma_suraksha::{
    auth::AuthError, evidence::StorageError, news::NewsError, reports::ReportError,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Message sent for every internal failure outside development mode
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

static DETAILED_ERRORS: AtomicBool = AtomicBool::new(false);

/// Return internal error details to clients (development deployments only)
pub fn set_detailed_errors(enabled: bool) {
    DETAILED_ERRORS.store(enabled, Ordering::Relaxed);
}

/// Errors returned by API handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or out-of-range input
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    /// Request collides with existing data
    #[error("{0}")]
    Conflict(String),

    /// Caller did not prove who they are
    #[error("{0}")]
    Unauthenticated(String),

    /// Resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Anything the client cannot fix; the detail is only logged
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// The generic 401 used for missing or rejected bearer tokens
    pub fn authentication_required() -> Self {
        ApiError::Unauthenticated("Authentication required".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // The web client expects duplicates as a plain bad request
            ApiError::Validation { .. } | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, field) = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                let message = if DETAILED_ERRORS.load(Ordering::Relaxed) {
                    detail
                } else {
                    INTERNAL_ERROR_MESSAGE.to_string()
                };
                (message, None)
            }
            ApiError::Validation { field, message } => (message, field),
            ApiError::Conflict(message)
            | ApiError::Unauthenticated(message)
            | ApiError::NotFound(message) => (message, None),
        };

        (status, Json(ErrorResponse { message, field })).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthenticated() {
            return ApiError::Unauthenticated(err.client_message());
        }
        if err.is_conflict() {
            return ApiError::Conflict(err.client_message());
        }

        match err {
            AuthError::InvalidUsername(_) => ApiError::validation("username", err.to_string()),
            AuthError::InvalidEmail(_) => ApiError::validation("email", err.to_string()),
            AuthError::MissingName => ApiError::validation("name", err.to_string()),
            AuthError::WeakPassword(_) => ApiError::validation("password", err.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedMediaType(_) | StorageError::PayloadTooLarge { .. } => {
                ApiError::bad_request(err.client_message())
            }
            StorageError::NotFound(_) => ApiError::NotFound(err.client_message()),
            StorageError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Storage(storage) => match storage {
                StorageError::UnsupportedMediaType(_) | StorageError::PayloadTooLarge { .. } => {
                    ApiError::validation("evidence_images", storage.client_message())
                }
                other => other.into(),
            },
            ReportError::Validation { field, message } => ApiError::Validation {
                field: Some(field),
                message,
            },
            ReportError::TooManyImages { .. } => {
                ApiError::validation("evidence_images", err.to_string())
            }
            ReportError::NotFound(_) => ApiError::NotFound("Report not found".to_string()),
            ReportError::Database(_) | ReportError::Timeout(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<NewsError> for ApiError {
    fn from(err: NewsError) -> Self {
        match err {
            NewsError::Validation { field, message } => ApiError::Validation {
                field: Some(field),
                message,
            },
            NewsError::Database(_) | NewsError::Timeout(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::bad_request("Upload too large");
        }
        ApiError::bad_request(err.body_text())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
