//! Extraction: content preparation, model invocation, result validation.

pub mod confidence;
pub mod excel;
pub mod gemini;
pub mod pdf;
pub mod prompt;
pub mod schema;

pub use confidence::{aggregate, ConfidenceSummary};
pub use gemini::{GeminiClient, GeminiError, GeminiExtractor};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ExtractedFields;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Model provider error: {0}")]
    Provider(#[from] gemini::GeminiError),

    #[error("Spreadsheet could not be parsed: {0}")]
    Spreadsheet(String),

    #[error("Model response failed validation: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The model seam: a black-box function from prepared document content to
/// the five structured fields. The production implementation is
/// [`GeminiExtractor`]; tests substitute their own.
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    /// Extract from a PDF handed over as raw bytes. The provider consumes
    /// the file natively; no local text extraction happens.
    async fn extract_pdf(
        &self,
        bytes: &[u8],
        file_name: &str,
        hash: &str,
    ) -> Result<ExtractedFields, ExtractionError>;

    /// Extract from pre-flattened text (spreadsheet content).
    async fn extract_text(&self, text: &str) -> Result<ExtractedFields, ExtractionError>;
}
