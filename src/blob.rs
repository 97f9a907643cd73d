//! Blob store boundary: uploaded images go in, a stable public path
//! comes out. The local implementation writes under a directory that the
//! HTTP layer serves statically.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the bytes and return the retrievable public path.
    async fn put(&self, original_name: Option<&str>, bytes: &[u8]) -> AppResult<String>;
}

pub struct LocalBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, original_name: Option<&str>, bytes: &[u8]) -> AppResult<String> {
        // Fresh name per upload; only the extension survives from the
        // client-supplied file name.
        let ext = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");
        let file_name = format!("{}.{}", Uuid::new_v4(), ext);

        tokio::fs::write(self.root.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to store upload: {}", e)))?;

        Ok(format!("{}/{}", self.public_prefix, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_the_file_and_returns_a_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = LocalBlobStore::new(dir.path(), "/uploads");
        blobs.ensure_root().await.unwrap();

        let path = blobs.put(Some("look.jpg"), b"not-really-a-jpeg").await.unwrap();
        assert!(path.starts_with("/uploads/"));
        assert!(path.ends_with(".jpg"));

        let file_name = path.rsplit('/').next().unwrap();
        let on_disk = tokio::fs::read(dir.path().join(file_name)).await.unwrap();
        assert_eq!(on_disk, b"not-really-a-jpeg");
    }
}
