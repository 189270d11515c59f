//! `POST /api/proposals/upload` — multipart batch intake.
//!
//! Each part is one file; per-file outcomes come back in order. A rejected
//! file (unsupported type, over the size ceiling) fails only itself, never
//! the batch. Newly created proposals sit in PENDING until the background
//! scan dispatches them.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::intake::ingest::{ingest_batch, IncomingFile, UploadOutcome};

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub results: Vec<UploadOutcome>,
}

pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?
            .to_vec();

        files.push(IncomingFile {
            file_name,
            mime_type,
            bytes,
        });
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("No files provided".into()));
    }

    let results = ingest_batch(&ctx.db_path, ctx.blob.as_ref(), files)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(UploadResponse {
        success: true,
        results,
    }))
}
