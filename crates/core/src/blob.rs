//! Blob storage for rendered QR images.
//!
//! The store is keyed by path and returns an opaque public reference on
//! save. `FsBlobStore` is the filesystem implementation; the engine only
//! ever talks to the trait.

use crate::Error;
use crate::config::AppConfig;
use async_trait::async_trait;
use std::path::PathBuf;

/// Object storage keyed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `path` and return a public reference to them.
    async fn save(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String, Error>;

    async fn delete(&self, path: &str) -> Result<(), Error>;
}

/// Filesystem-backed blob store rooted at a configured directory.
///
/// The public reference is served under `<public_base_url>/blobs/<path>`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self { root, public_base_url }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.blob_root.clone(), config.public_base_url.clone())
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, Error> {
        // Keys are generated internally, but reject traversal anyway.
        if path.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(Error::InvalidInput(format!("bad blob path: {path}")));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<String, Error> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Dependency(format!("blob mkdir failed: {e}")))?;
        }

        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| Error::Dependency(format!("blob write failed: {e}")))?;

        Ok(format!("{}/blobs/{path}", self.public_base_url.trim_end_matches('/')))
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| Error::Dependency(format!("blob delete failed: {e}")))
    }
}
