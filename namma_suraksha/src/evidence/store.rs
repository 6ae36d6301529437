//! Disk-backed image store.

use super::errors::{StorageError, StorageResult};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Default per-file size ceiling (5 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Accepted upload content types
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// An uploaded file as received from the client
#[derive(Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub mime_type: String,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("len", &self.bytes.len())
            .field("original_name", &self.original_name)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Reference to a stored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub filename: String,
    pub size: usize,
}

/// Image store rooted at a single directory
#[derive(Debug)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    /// Open (and create if needed) an image store directory
    ///
    /// # Arguments
    ///
    /// * `root` - Directory holding the images
    /// * `max_bytes` - Per-file size ceiling
    pub async fn open(root: impl Into<PathBuf>, max_bytes: usize) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root, max_bytes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check an upload against the allow-list and size ceiling without writing it
    ///
    /// # Errors
    ///
    /// * `StorageError::UnsupportedMediaType` - Content type not in [`ALLOWED_MIME_TYPES`]
    /// * `StorageError::PayloadTooLarge` - Upload larger than the store's ceiling
    pub fn check(&self, upload: &ImageUpload) -> StorageResult<()> {
        let mime = upload.mime_type.trim().to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(StorageError::UnsupportedMediaType(upload.mime_type.clone()));
        }

        if upload.bytes.len() > self.max_bytes {
            return Err(StorageError::PayloadTooLarge {
                size: upload.bytes.len(),
                max: self.max_bytes,
            });
        }

        Ok(())
    }

    /// Validate and write an upload under a freshly generated name
    ///
    /// # Errors
    ///
    /// See [`check`](Self::check); I/O failures surface as `StorageError::Io`.
    pub async fn store(&self, upload: &ImageUpload) -> StorageResult<StoredImage> {
        self.check(upload)?;

        let mime = upload.mime_type.trim().to_ascii_lowercase();
        let extension = extension_for(&upload.original_name, &mime);
        let filename = format!(
            "{}-{:016x}.{}",
            Utc::now().timestamp_millis(),
            rand::random::<u64>(),
            extension
        );

        let path = self.root.join(&filename);
        // create_new: a name collision must never overwrite someone else's evidence
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        let written = async {
            file.write_all(&upload.bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        log::debug!("Stored image {} ({} bytes)", filename, upload.bytes.len());

        Ok(StoredImage {
            filename,
            size: upload.bytes.len(),
        })
    }

    /// Read a stored image
    pub async fn retrieve(&self, filename: &str) -> StorageResult<Vec<u8>> {
        let path = self
            .path_for(filename)
            .ok_or_else(|| StorageError::NotFound(filename.to_string()))?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored image; deleting a missing image is not an error
    pub async fn delete(&self, filename: &str) -> StorageResult<()> {
        let Some(path) = self.path_for(filename) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Blocking delete for use where no runtime is available (drop glue)
    pub(crate) fn delete_blocking(&self, filename: &str) -> std::io::Result<()> {
        let Some(path) = self.path_for(filename) else {
            return Ok(());
        };

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Resolve a stored name to a path inside the store root
    ///
    /// Names with separators, `..` or other characters a generated name
    /// never contains resolve to `None`.
    fn path_for(&self, filename: &str) -> Option<PathBuf> {
        let valid = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains("..")
            && filename
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_');
        valid.then(|| self.root.join(filename))
    }
}

/// Content type to serve for a stored image name
pub fn content_type_for(filename: &str) -> &'static str {
    match Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Keep the client's extension when it is a plain short token, else derive from the mime type
fn extension_for(original_name: &str, mime: &str) -> String {
    let from_name = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        match mime {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "jpg",
        }
        .to_string()
    })
}
