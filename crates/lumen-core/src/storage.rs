//! Object storage for exported images.
//!
//! The core only knows the [`ImageStore`] trait; it never calls a store on
//! its own. Callers decide what to export and when.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::mime_extension;
use crate::config::Config;
use crate::error::StorageError;
use crate::types::Image;

/// Somewhere images can be uploaded to, returning a URL for each.
///
/// Uses `async_trait` so stores can be held as `Box<dyn ImageStore>`.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Store the image, returning a URL that retrieves it.
    async fn save(&self, image: &Image) -> Result<String, StorageError>;
}

/// Writes images into a local directory.
pub struct LocalDirStore {
    dir: PathBuf,
    counter: AtomicU64,
}

impl LocalDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Store under the configured `storage.dir`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.storage_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `image-<millis>-<n>.<ext>`; the counter keeps names unique within
    /// one millisecond.
    fn object_name(&self, image: &Image) -> Result<String, StorageError> {
        let extension = mime_extension(image.mime_type());
        if extension == "bin" {
            return Err(StorageError::Unsupported(format!(
                "no file extension for {}",
                image.mime_type()
            )));
        }
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!("image-{}-{}.{}", millis, n, extension))
    }
}

#[async_trait]
impl ImageStore for LocalDirStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn save(&self, image: &Image) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(self.object_name(image)?);
        tokio::fs::write(&path, image.bytes()).await?;

        let absolute = tokio::fs::canonicalize(&path).await?;
        tracing::debug!("Stored {} at {:?}", image.id(), absolute);
        Ok(format!("file://{}", absolute.display()))
    }
}
