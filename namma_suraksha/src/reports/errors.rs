//! Report error types.

use crate::{db::timeouts::TimeoutError, evidence::StorageError, geo::GeoError};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while validating, storing or reading incident reports
#[derive(Debug, Error)]
pub enum ReportError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its deadline
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// A submitted field is missing or out of range
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Report does not exist
    #[error("Report {0} not found")]
    NotFound(i64),

    /// Evidence image rejected or could not be written
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// More evidence images than a single report may carry
    #[error("At most {max} evidence images are allowed, got {count}")]
    TooManyImages { count: usize, max: usize },
}

impl ReportError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ReportError::Validation {
            field,
            message: message.into(),
        }
    }

    /// The offending field, for validation failures
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ReportError::Validation { field, .. } => Some(field),
            ReportError::TooManyImages { .. } => Some("evidence_images"),
            _ => None,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            ReportError::Database(_) | ReportError::Timeout(_) => {
                "Internal server error".to_string()
            }
            ReportError::Storage(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for ReportError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => ReportError::Timeout(d),
            TimeoutError::Database(e) => ReportError::Database(e),
        }
    }
}

impl From<GeoError> for ReportError {
    fn from(err: GeoError) -> Self {
        ReportError::validation(err.field(), err.to_string())
    }
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;
