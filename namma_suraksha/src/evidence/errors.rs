//! Image storage error types.

use thiserror::Error;

/// Image storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Content type outside the image allow-list
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Upload above the size ceiling
    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// No stored image with this name
    #[error("Image not found: {0}")]
    NotFound(String),
}

impl StorageError {
    /// Get a client-safe error message that doesn't leak filesystem paths
    pub fn client_message(&self) -> String {
        match self {
            StorageError::Io(_) => "Internal server error".to_string(),
            StorageError::NotFound(_) => "Image not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for image storage operations
pub type StorageResult<T> = Result<T, StorageError>;
