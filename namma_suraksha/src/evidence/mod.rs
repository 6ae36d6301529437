//! Evidence image storage.
//!
//! Uploaded photos are written to a local directory under a generated name
//! (`<unix millis>-<random hex>.<ext>`); the client's file name is only
//! consulted for its extension. Reports reference images by that generated
//! name.
//!
//! Writes that belong to a request go through [`StagedImages`], which
//! deletes everything it stored unless the request commits:
//!
//! ```no_run
//! use namma_suraksha::evidence::{ImageStore, ImageUpload, StagedImages};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(ImageStore::open("uploads/evidence", 5 * 1024 * 1024).await?);
//! let mut staged = StagedImages::new(store);
//! staged
//!     .stage(ImageUpload {
//!         bytes: std::fs::read("bike.jpg")?,
//!         original_name: "bike.jpg".to_string(),
//!         mime_type: "image/jpeg".to_string(),
//!     })
//!     .await?;
//!
//! // ... persist the report; if this line is never reached the file is removed
//! let filenames = staged.commit();
//! # let _ = filenames;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod staged;
pub mod store;

pub use errors::{StorageError, StorageResult};
pub use staged::StagedImages;
pub use store::{
    ALLOWED_MIME_TYPES, DEFAULT_MAX_IMAGE_BYTES, ImageStore, ImageUpload, StoredImage,
    content_type_for,
};
