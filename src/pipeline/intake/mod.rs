//! Intake: deduplication, validation, blob upload, proposal creation.

pub mod filetype;
pub mod hash;
pub mod ingest;

pub use filetype::{resolve_file_type, FileType};
pub use hash::content_hash;
pub use ingest::{ingest_batch, IncomingFile, UploadOutcome, UploadStatus};

use thiserror::Error;

use crate::db::DatabaseError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
