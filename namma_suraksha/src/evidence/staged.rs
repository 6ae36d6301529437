//! Request-scoped image writes with guaranteed cleanup.

use super::{
    errors::StorageResult,
    store::{ImageStore, ImageUpload, StoredImage},
};
use std::sync::Arc;

/// Images written on behalf of one request.
///
/// Every image stored through the guard is deleted again unless
/// [`commit`](Self::commit) is called. [`rollback`](Self::rollback) does the
/// deletion asynchronously on known failure paths; `Drop` covers every other
/// exit (early returns, panics, a cancelled request future).
#[derive(Debug)]
pub struct StagedImages {
    store: Arc<ImageStore>,
    filenames: Vec<String>,
    committed: bool,
}

impl StagedImages {
    pub fn new(store: Arc<ImageStore>) -> Self {
        Self {
            store,
            filenames: Vec::new(),
            committed: false,
        }
    }

    /// Store an upload and track it for rollback
    pub async fn stage(&mut self, upload: ImageUpload) -> StorageResult<StoredImage> {
        let stored = self.store.store(&upload).await?;
        self.filenames.push(stored.filename.clone());
        Ok(stored)
    }

    /// Names of everything staged so far, in upload order
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// Keep the staged images and hand back their names
    pub fn commit(mut self) -> Vec<String> {
        self.committed = true;
        std::mem::take(&mut self.filenames)
    }

    /// Delete every staged image now
    pub async fn rollback(mut self) {
        let filenames = std::mem::take(&mut self.filenames);
        for filename in &filenames {
            if let Err(e) = self.store.delete(filename).await {
                log::error!("Failed to roll back staged image {}: {}", filename, e);
            }
        }
        if !filenames.is_empty() {
            log::info!("Rolled back {} staged image(s)", filenames.len());
        }
    }
}

impl Drop for StagedImages {
    fn drop(&mut self) {
        if self.committed || self.filenames.is_empty() {
            return;
        }

        for filename in self.filenames.drain(..) {
            if let Err(e) = self.store.delete_blocking(&filename) {
                log::error!("Failed to remove abandoned image {}: {}", filename, e);
            }
        }
        log::warn!("Removed images staged by an abandoned request");
    }
}
