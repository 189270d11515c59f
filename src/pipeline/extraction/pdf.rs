//! PDF extraction path: stage to a scoped temp file, hand the file to the
//! provider's file store, wait (bounded) for it to finish processing, then
//! generate against the file reference. No local text extraction — the
//! model consumes the PDF natively.

use std::time::Duration;

use crate::models::ExtractedFields;
use crate::pipeline::intake::filetype::MIME_PDF;

use super::gemini::{GeminiClient, GeminiError, GeminiFile, Part};
use super::prompt::EXTRACTION_SYSTEM_PROMPT;
use super::schema::parse_extraction;
use super::ExtractionError;

pub async fn extract_pdf_fields(
    client: &GeminiClient,
    model: &str,
    bytes: &[u8],
    file_name: &str,
    hash: &str,
    poll_interval: Duration,
    poll_deadline: Duration,
) -> Result<ExtractedFields, ExtractionError> {
    // Stage under a hash-derived name in a scoped temp dir; the dir guard
    // removes it on every exit path.
    let staging = tempfile::tempdir()?;
    let staged_path = staging.path().join(format!("{hash}.pdf"));
    tokio::fs::write(&staged_path, bytes).await?;
    let staged = tokio::fs::read(&staged_path).await?;

    let file = client.upload_file(staged, MIME_PDF, file_name).await?;
    tracing::debug!(file = %file.name, proposal_file = %file_name, "Uploaded PDF to provider file store");

    let generated = generate_with_file(client, model, &file, poll_interval, poll_deadline).await;

    // Provider-side cleanup happens regardless of how generation went.
    if let Err(e) = client.delete_file(&file.name).await {
        tracing::warn!(file = %file.name, error = %e, "Failed to delete provider-side file");
    }

    let raw = generated?;
    parse_extraction(&raw)
}

async fn generate_with_file(
    client: &GeminiClient,
    model: &str,
    file: &GeminiFile,
    poll_interval: Duration,
    poll_deadline: Duration,
) -> Result<String, GeminiError> {
    let active = client
        .wait_for_active(&file.name, poll_interval, poll_deadline)
        .await?;

    let mime = active
        .mime_type
        .clone()
        .unwrap_or_else(|| MIME_PDF.to_string());
    let parts = [
        Part::file(mime, active.uri.clone()),
        Part::text(EXTRACTION_SYSTEM_PROMPT),
    ];
    client.generate(model, &parts).await
}
