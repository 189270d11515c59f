//! Filesystem-backed blob store for local runs and tests.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{BlobStore, StorageError};

/// Stores blobs as plain files under a root directory. Keys are flat
/// (hash-prefixed), so no directory fan-out is needed at this scale.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        // Keys are produced from a hex hash + sanitized filename, but never
        // trust them as paths: strip anything that could escape the root.
        let safe: String = key
            .chars()
            .filter(|c| !matches!(c, '/' | '\\' | '\0'))
            .collect();
        self.root.join(safe)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.blob_path(key), bytes).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("local://{}", self.blob_path(key).display())
    }
}
