//! Per-proposal pipeline: fetch → mark processing → download → dispatch by
//! file type → model call → aggregate → persist → report.
//!
//! Every failure after the processing-status write is caught here and
//! converted into a failed-status update plus a typed error; nothing
//! escapes to the API layer as a panic. Field rows only change inside the
//! final transaction, so a failed run leaves prior data intact.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository::{
    fields_for_proposal, get_proposal, store_extraction, update_status,
};
use crate::db::sqlite::open_database;
use crate::db::DatabaseError;
use crate::models::{
    ConfidenceLevel, ExtractedFields, ExtractionField, FieldName, FieldResult, Proposal,
    ProposalStatus,
};
use crate::storage::{BlobStore, StorageError};

use super::extraction::confidence::aggregate;
use super::extraction::excel::flatten_workbook;
use super::extraction::{ExtractionError, ExtractionModel};
use super::intake::filetype::{resolve_file_type, FileType};
use super::intake::ingest::storage_key;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Proposal not found: {0}")]
    NotFound(Uuid),

    #[error("Proposal has no stored file")]
    MissingFile,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}

impl PipelineError {
    /// Short, provider-detail-free message for API responses.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Proposal not found",
            Self::MissingFile => "File URL missing for proposal",
            Self::UnsupportedFileType(_) => "Unsupported file type",
            Self::Storage(_) | Self::Extraction(_) => "AI processing failed",
            Self::Database(_) => "Failed to persist extraction results",
        }
    }
}

/// Flattened extraction result for the caller, mirroring what the review
/// dashboard renders: the five values, the derived view, and the full
/// per-field map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub company_name: Option<String>,
    pub trade: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub review_needed: bool,
    pub overall_confidence: ConfidenceLevel,
    pub fields: BTreeMap<String, FieldResult>,
}

impl ProcessOutcome {
    fn from_extracted(extracted: &ExtractedFields) -> Self {
        let summary = aggregate(extracted.confidences());
        let fields: BTreeMap<String, FieldResult> = extracted
            .iter()
            .map(|(name, field)| (name.as_str().to_string(), field.clone()))
            .collect();

        Self {
            company_name: extracted.get(FieldName::CompanyName).value.clone(),
            trade: extracted.get(FieldName::Trade).value.clone(),
            contact_name: extracted.get(FieldName::ContactName).value.clone(),
            email: extracted.get(FieldName::Email).value.clone(),
            phone: extracted.get(FieldName::Phone).value.clone(),
            review_needed: summary.review_needed,
            overall_confidence: summary.overall,
            fields,
        }
    }

    fn from_stored(stored: &[ExtractionField]) -> Self {
        let summary = aggregate(stored.iter().map(|f| f.confidence));
        let lookup = |name: FieldName| {
            stored
                .iter()
                .find(|f| f.name == name)
                .and_then(|f| f.value.clone())
        };
        let fields: BTreeMap<String, FieldResult> = stored
            .iter()
            .map(|f| (f.name.as_str().to_string(), FieldResult::from(f)))
            .collect();

        Self {
            company_name: lookup(FieldName::CompanyName),
            trade: lookup(FieldName::Trade),
            contact_name: lookup(FieldName::ContactName),
            email: lookup(FieldName::Email),
            phone: lookup(FieldName::Phone),
            review_needed: summary.review_needed,
            overall_confidence: summary.overall,
            fields,
        }
    }
}

/// Orchestrates extraction for single proposals. Clients are injected once
/// at construction; each call opens its own database connection.
pub struct Pipeline {
    db_path: PathBuf,
    blob: Arc<dyn BlobStore>,
    model: Arc<dyn ExtractionModel>,
}

impl Pipeline {
    pub fn new(
        db_path: impl Into<PathBuf>,
        blob: Arc<dyn BlobStore>,
        model: Arc<dyn ExtractionModel>,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            blob,
            model,
        }
    }

    /// Run the full pipeline for one proposal.
    ///
    /// A completed proposal is a no-op success returning the persisted
    /// result. The processing-status write lands before any external call,
    /// so a crash mid-flight leaves a recoverable (retryable) state.
    pub async fn process(&self, id: &Uuid) -> Result<ProcessOutcome, PipelineError> {
        let mut conn = open_database(&self.db_path)?;

        let proposal = get_proposal(&conn, id)?.ok_or(PipelineError::NotFound(*id))?;

        if proposal.status == ProposalStatus::Completed {
            tracing::info!(proposal_id = %id, "Proposal already completed, returning stored result");
            let stored = fields_for_proposal(&conn, id)?;
            return Ok(ProcessOutcome::from_stored(&stored));
        }

        if proposal.file_url.is_none() {
            return Err(PipelineError::MissingFile);
        }

        update_status(&conn, id, ProposalStatus::Processing)?;
        tracing::info!(proposal_id = %id, file = %proposal.file_name, "Extraction started");

        match self.extract_and_persist(&mut conn, &proposal).await {
            Ok(outcome) => {
                tracing::info!(
                    proposal_id = %id,
                    overall = outcome.overall_confidence.as_str(),
                    review_needed = outcome.review_needed,
                    "Extraction completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(proposal_id = %id, error = %e, "Extraction pipeline failed");
                if let Err(status_err) = update_status(&conn, id, ProposalStatus::Failed) {
                    tracing::error!(
                        proposal_id = %id,
                        error = %status_err,
                        "Could not mark proposal failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn extract_and_persist(
        &self,
        conn: &mut Connection,
        proposal: &Proposal,
    ) -> Result<ProcessOutcome, PipelineError> {
        let key = storage_key(&proposal.hash, &proposal.file_name);
        let bytes = self.blob.download(&key).await?;

        let extracted = match resolve_file_type(&proposal.file_name, proposal.mime_type.as_deref())
        {
            FileType::Pdf => {
                self.model
                    .extract_pdf(&bytes, &proposal.file_name, &proposal.hash)
                    .await?
            }
            FileType::Excel => {
                let text = flatten_workbook(&bytes)?;
                self.model.extract_text(&text).await?
            }
            FileType::Unsupported => {
                return Err(PipelineError::UnsupportedFileType(
                    proposal.file_name.clone(),
                ))
            }
        };

        // All five fields plus the completed status commit atomically.
        store_extraction(conn, &proposal.id, &extracted)?;

        Ok(ProcessOutcome::from_extracted(&extracted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_proposal;
    use crate::models::{ApprovalStatus, FieldSource};
    use crate::pipeline::intake::ingest::storage_key;
    use crate::pipeline::testing::{sample_fields, workspace, StubModel};
    use crate::storage::LocalBlobStore;

    async fn seed_proposal(
        db_path: &std::path::Path,
        blob: &LocalBlobStore,
        file_name: &str,
        mime_type: Option<&str>,
        content: &[u8],
    ) -> Proposal {
        let conn = open_database(db_path).unwrap();
        let hash = crate::pipeline::intake::content_hash(content);
        let key = storage_key(&hash, file_name);
        blob.upload(&key, content, "application/octet-stream")
            .await
            .unwrap();

        let now = chrono::Utc::now().naive_utc();
        let proposal = Proposal {
            id: Uuid::new_v4(),
            hash,
            file_name: file_name.to_string(),
            mime_type: mime_type.map(str::to_string),
            file_url: Some(blob.public_url(&key)),
            status: ProposalStatus::Pending,
            approval_status: ApprovalStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        insert_proposal(&conn, &proposal).unwrap();
        proposal
    }

    fn load(db_path: &std::path::Path, id: &Uuid) -> (Proposal, Vec<ExtractionField>) {
        let conn = open_database(db_path).unwrap();
        let proposal = get_proposal(&conn, id).unwrap().unwrap();
        let fields = fields_for_proposal(&conn, id).unwrap();
        (proposal, fields)
    }

    #[tokio::test]
    async fn pdf_happy_path_persists_fields_and_completes() {
        let (_dir, db_path, blob) = workspace();
        let model = Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High)));
        let proposal = seed_proposal(
            &db_path,
            &blob,
            "invoice.pdf",
            Some("application/pdf"),
            b"%PDF-1.4 bid",
        )
        .await;

        let pipeline = Pipeline::new(&db_path, blob.clone(), model.clone());
        let outcome = pipeline.process(&proposal.id).await.unwrap();

        assert_eq!(outcome.trade.as_deref(), Some("Plumbing"));
        assert_eq!(outcome.overall_confidence, ConfidenceLevel::High);
        assert!(!outcome.review_needed);
        assert_eq!(outcome.fields.len(), 5);

        let (loaded, fields) = load(&db_path, &proposal.id);
        assert_eq!(loaded.status, ProposalStatus::Completed);
        assert_eq!(fields.len(), 5);
        assert!(fields.iter().all(|f| f.source == FieldSource::Ai));
        assert_eq!(model.pdf_calls(), 1);
    }

    #[tokio::test]
    async fn low_confidence_field_flags_review() {
        let (_dir, db_path, blob) = workspace();
        let mut extracted = sample_fields(ConfidenceLevel::High);
        extracted.trade.confidence = ConfidenceLevel::Low;
        let model = Arc::new(StubModel::ok(extracted));
        let proposal =
            seed_proposal(&db_path, &blob, "bid.pdf", Some("application/pdf"), b"%PDF").await;

        let pipeline = Pipeline::new(&db_path, blob, model);
        let outcome = pipeline.process(&proposal.id).await.unwrap();

        assert_eq!(outcome.overall_confidence, ConfidenceLevel::Low);
        assert!(outcome.review_needed);
    }

    #[tokio::test]
    async fn model_failure_marks_failed_and_writes_no_fields() {
        let (_dir, db_path, blob) = workspace();
        let model = Arc::new(StubModel::failing());
        let proposal =
            seed_proposal(&db_path, &blob, "bid.pdf", Some("application/pdf"), b"%PDF").await;

        let pipeline = Pipeline::new(&db_path, blob, model);
        let result = pipeline.process(&proposal.id).await;

        assert!(matches!(result, Err(PipelineError::Extraction(_))));
        let (loaded, fields) = load(&db_path, &proposal.id);
        assert_eq!(loaded.status, ProposalStatus::Failed);
        assert!(fields.is_empty(), "Failed run must not persist field rows");
    }

    #[tokio::test]
    async fn completed_proposal_is_noop_success() {
        let (_dir, db_path, blob) = workspace();
        let model = Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High)));
        let proposal =
            seed_proposal(&db_path, &blob, "bid.pdf", Some("application/pdf"), b"%PDF").await;

        let pipeline = Pipeline::new(&db_path, blob, model.clone());
        pipeline.process(&proposal.id).await.unwrap();
        let second = pipeline.process(&proposal.id).await.unwrap();

        assert_eq!(second.trade.as_deref(), Some("Plumbing"));
        assert_eq!(
            model.pdf_calls(),
            1,
            "Completed proposal must not be re-sent to the model"
        );
    }

    #[tokio::test]
    async fn unknown_proposal_is_not_found() {
        let (_dir, db_path, blob) = workspace();
        let pipeline = Pipeline::new(
            &db_path,
            blob,
            Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))),
        );
        let result = pipeline.process(&Uuid::new_v4()).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }

    #[tokio::test]
    async fn unsupported_file_type_fails_the_item() {
        let (_dir, db_path, blob) = workspace();
        let model = Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High)));
        let proposal = seed_proposal(&db_path, &blob, "notes.docx", None, b"word doc").await;

        let pipeline = Pipeline::new(&db_path, blob, model.clone());
        let result = pipeline.process(&proposal.id).await;

        assert!(matches!(result, Err(PipelineError::UnsupportedFileType(_))));
        let (loaded, _) = load(&db_path, &proposal.id);
        assert_eq!(loaded.status, ProposalStatus::Failed);
        assert_eq!(model.pdf_calls() + model.text_calls(), 0);
    }

    #[tokio::test]
    async fn corrupt_excel_fails_the_item() {
        let (_dir, db_path, blob) = workspace();
        let model = Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High)));
        let proposal =
            seed_proposal(&db_path, &blob, "bids.xlsx", None, b"not a workbook").await;

        let pipeline = Pipeline::new(&db_path, blob, model.clone());
        let result = pipeline.process(&proposal.id).await;

        assert!(matches!(
            result,
            Err(PipelineError::Extraction(ExtractionError::Spreadsheet(_)))
        ));
        let (loaded, _) = load(&db_path, &proposal.id);
        assert_eq!(loaded.status, ProposalStatus::Failed);
        assert_eq!(model.text_calls(), 0, "Model must not see unparseable content");
    }

    #[tokio::test]
    async fn retry_after_failure_reprocesses_from_scratch() {
        let (_dir, db_path, blob) = workspace();
        let proposal =
            seed_proposal(&db_path, &blob, "bid.pdf", Some("application/pdf"), b"%PDF").await;

        // First attempt fails
        let failing = Pipeline::new(&db_path, blob.clone(), Arc::new(StubModel::failing()));
        assert!(failing.process(&proposal.id).await.is_err());

        // Operator retries: status back to pending, then a clean run
        {
            let conn = open_database(&db_path).unwrap();
            update_status(&conn, &proposal.id, ProposalStatus::Pending).unwrap();
        }
        let working = Pipeline::new(
            &db_path,
            blob,
            Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High))),
        );
        let outcome = working.process(&proposal.id).await.unwrap();

        assert!(!outcome.review_needed);
        let (loaded, fields) = load(&db_path, &proposal.id);
        assert_eq!(loaded.status, ProposalStatus::Completed);
        assert_eq!(fields.len(), 5);
    }

    #[tokio::test]
    async fn missing_blob_marks_failed() {
        let (_dir, db_path, blob) = workspace();
        let model = Arc::new(StubModel::ok(sample_fields(ConfidenceLevel::High)));

        // Insert a proposal without uploading its blob
        let conn = open_database(&db_path).unwrap();
        let now = chrono::Utc::now().naive_utc();
        let proposal = Proposal {
            id: Uuid::new_v4(),
            hash: "nohash".to_string(),
            file_name: "ghost.pdf".to_string(),
            mime_type: Some("application/pdf".to_string()),
            file_url: Some("local://missing".to_string()),
            status: ProposalStatus::Pending,
            approval_status: ApprovalStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        insert_proposal(&conn, &proposal).unwrap();
        drop(conn);

        let pipeline = Pipeline::new(&db_path, blob, model);
        let result = pipeline.process(&proposal.id).await;

        assert!(matches!(result, Err(PipelineError::Storage(_))));
        let (loaded, _) = load(&db_path, &proposal.id);
        assert_eq!(loaded.status, ProposalStatus::Failed);
    }
}
