//! Batch intake: hash → dedup → validate → upload → proposal row.
//!
//! Each file is handled independently; a rejected or failed file never
//! aborts the rest of the batch. Upload and record creation are not atomic,
//! but the failure mode is safe: an upload that dies leaves no proposal row
//! at all, and a row that fails to insert leaves only an orphaned blob under
//! a content-addressed key that a later retry will simply overwrite.

use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{get_proposal_by_hash, insert_proposal};
use crate::db::sqlite::open_database;
use crate::models::{ApprovalStatus, Proposal, ProposalStatus};
use crate::storage::BlobStore;

use super::filetype::resolve_file_type;
use super::hash::content_hash;
use super::IntakeError;

/// Upload size ceiling per file (50 MB).
pub const MAX_FILE_SIZE_BYTES: usize = 50 * 1024 * 1024;

/// One file as received from the upload endpoint.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    Success,
    Duplicate,
    Failed,
}

/// Per-file intake outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub file_name: String,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadOutcome {
    fn success(file_name: String, id: Uuid) -> Self {
        Self {
            file_name,
            status: UploadStatus::Success,
            id: Some(id),
            error: None,
        }
    }

    fn duplicate(file_name: String, existing: Uuid) -> Self {
        Self {
            file_name,
            status: UploadStatus::Duplicate,
            id: Some(existing),
            error: None,
        }
    }

    fn failed(file_name: String, error: impl Into<String>) -> Self {
        Self {
            file_name,
            status: UploadStatus::Failed,
            id: None,
            error: Some(error.into()),
        }
    }
}

/// Ingest a batch of uploaded files, one outcome per file.
pub async fn ingest_batch(
    db_path: &Path,
    blob: &dyn BlobStore,
    files: Vec<IncomingFile>,
) -> Result<Vec<UploadOutcome>, IntakeError> {
    let mut conn = open_database(db_path)?;

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let file_name = file.file_name.clone();
        match ingest_file(&mut conn, blob, file).await {
            Ok(outcome) => results.push(outcome),
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "Failed to ingest file");
                results.push(UploadOutcome::failed(file_name, "Upload failed"));
            }
        }
    }
    Ok(results)
}

async fn ingest_file(
    conn: &mut Connection,
    blob: &dyn BlobStore,
    file: IncomingFile,
) -> Result<UploadOutcome, IntakeError> {
    if file.bytes.len() > MAX_FILE_SIZE_BYTES {
        return Ok(UploadOutcome::failed(
            file.file_name,
            format!(
                "File exceeds the {} MB size limit",
                MAX_FILE_SIZE_BYTES / (1024 * 1024)
            ),
        ));
    }

    if !resolve_file_type(&file.file_name, file.mime_type.as_deref()).is_supported() {
        return Ok(UploadOutcome::failed(
            file.file_name,
            "Unsupported file type (expected PDF or Excel)",
        ));
    }

    let hash = content_hash(&file.bytes);

    if let Some(existing) = get_proposal_by_hash(conn, &hash)? {
        tracing::info!(
            file = %file.file_name,
            duplicate_of = %existing.id,
            "Duplicate upload detected, skipping re-processing"
        );
        return Ok(UploadOutcome::duplicate(file.file_name, existing.id));
    }

    let key = storage_key(&hash, &file.file_name);
    let content_type = file
        .mime_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    blob.upload(&key, &file.bytes, &content_type).await?;
    let file_url = blob.public_url(&key);

    let now = chrono::Utc::now().naive_utc();
    let proposal = Proposal {
        id: Uuid::new_v4(),
        hash,
        file_name: file.file_name.clone(),
        mime_type: file.mime_type,
        file_url: Some(file_url),
        status: ProposalStatus::Pending,
        approval_status: ApprovalStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    insert_proposal(conn, &proposal)?;

    tracing::info!(
        proposal_id = %proposal.id,
        file = %file.file_name,
        size = file.bytes.len(),
        "Proposal created and queued for extraction"
    );

    Ok(UploadOutcome::success(file.file_name, proposal.id))
}

/// Blob key for a proposal file: content hash + sanitized filename.
/// Same content ⇒ same key, so overwriting is always safe.
pub fn storage_key(hash: &str, file_name: &str) -> String {
    format!("{hash}-{}", sanitize_filename(file_name))
}

/// Strip everything but [A-Za-z0-9.-] from a filename, bounded to 255 chars.
pub fn sanitize_filename(original: &str) -> String {
    let clean: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}
