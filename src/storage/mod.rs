//! Blob storage for raw proposal files.
//!
//! The store is an external collaborator with a small contract: put bytes
//! under a key, get them back, and resolve a publicly shareable URL. Keys
//! are derived from the content hash, so re-uploading the same key always
//! writes identical content.

pub mod http;
pub mod local;

pub use http::HttpBlobStore;
pub use local::LocalBlobStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Cannot reach storage backend: {0}")]
    Connection(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload / download / public-URL contract over the object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, overwriting any existing blob (upsert).
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str)
        -> Result<(), StorageError>;

    /// Fetch the bytes stored under `key`.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Publicly resolvable URL for `key`.
    fn public_url(&self, key: &str) -> String;
}
