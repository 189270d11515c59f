//! HTTP client for the hosted generative model (Gemini-style API).
//!
//! Three surfaces: the file store (upload / get / delete, used for PDFs the
//! model consumes natively), a bounded readiness poll over the file store,
//! and `generateContent` with a declared response schema so the model is
//! constrained to our extraction contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::ExtractedFields;

use super::prompt::EXTRACTION_SYSTEM_PROMPT;
use super::schema::{parse_extraction, response_schema};
use super::{pdf, ExtractionError, ExtractionModel};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Fixed poll cadence against the provider's file store.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Upper bound on the readiness wait; a file still processing past this is
/// treated as a failed item rather than waited on forever.
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Cannot reach model provider: {0}")]
    Connection(String),

    #[error("Provider request timed out: {0}")]
    Timeout(String),

    #[error("Provider returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Provider response had no generated text")]
    EmptyResponse,

    #[error("Provider response was malformed: {0}")]
    InvalidPayload(String),

    #[error("Provider failed to process the uploaded file")]
    FileProcessingFailed,

    #[error("Provider file still processing after {waited_secs}s, giving up")]
    ProcessingTimeout { waited_secs: u64 },
}

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

/// Processing state of a provider-side file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    #[default]
    Unknown,
}

/// A file held in the provider's file store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFile {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub state: FileState,
}

#[derive(Deserialize)]
struct UploadFileResponse {
    file: GeminiFile,
}

/// One content part of a generation request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn file(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Self::FileData {
            file_data: FileData {
                mime_type: mime_type.into(),
                file_uri: file_uri.into(),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: &'a [Part],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn response_text(response: GenerateResponse) -> Result<String, GeminiError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
        .ok_or(GeminiError::EmptyResponse)
}

// ═══════════════════════════════════════════════════════════
// GeminiClient
// ═══════════════════════════════════════════════════════════

/// Low-level provider HTTP client. Constructed once at process start and
/// shared; no module-level singleton.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("HTTP client construction");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload raw bytes to the provider's file store. The returned file may
    /// still be PROCESSING; callers poll with [`wait_for_active`].
    ///
    /// [`wait_for_active`]: GeminiClient::wait_for_active
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<GeminiFile, GeminiError> {
        let url = format!(
            "{}/upload/v1beta/files?uploadType=multipart&key={}",
            self.base_url, self.api_key
        );

        let metadata = serde_json::json!({ "file": { "display_name": display_name } });
        let metadata_part = reqwest::multipart::Part::text(metadata.to_string())
            .mime_str("application/json")
            .map_err(|e| GeminiError::InvalidPayload(e.to_string()))?;
        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(display_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| GeminiError::InvalidPayload(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let payload: UploadFileResponse = Self::read_json(response).await?;
        Ok(payload.file)
    }

    /// Fetch the current state of a provider-side file (`name` is the full
    /// resource name, e.g. `files/abc123`).
    pub async fn get_file(&self, name: &str) -> Result<GeminiFile, GeminiError> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::read_json(response).await
    }

    /// Delete a provider-side file. Best-effort cleanup; callers log failures.
    pub async fn delete_file(&self, name: &str) -> Result<(), GeminiError> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Poll the file store at `interval` until the file leaves PROCESSING.
    /// Bounded: a file still processing once `deadline` has elapsed fails
    /// with [`GeminiError::ProcessingTimeout`] instead of waiting forever.
    pub async fn wait_for_active(
        &self,
        name: &str,
        interval: Duration,
        deadline: Duration,
    ) -> Result<GeminiFile, GeminiError> {
        let start = tokio::time::Instant::now();
        loop {
            let file = self.get_file(name).await?;
            match file.state {
                FileState::Processing => {
                    if start.elapsed() >= deadline {
                        return Err(GeminiError::ProcessingTimeout {
                            waited_secs: start.elapsed().as_secs(),
                        });
                    }
                    tokio::time::sleep(interval).await;
                }
                FileState::Failed => return Err(GeminiError::FileProcessingFailed),
                FileState::Active | FileState::Unknown => return Ok(file),
            }
        }
    }

    /// Run one schema-constrained generation call and return the raw
    /// generated text (expected to be the JSON extraction payload).
    pub async fn generate(&self, model: &str, parts: &[Part]) -> Result<String, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let payload: GenerateResponse = Self::read_json(response).await?;
        response_text(payload)
    }

    fn map_send_error(&self, e: reqwest::Error) -> GeminiError {
        if e.is_connect() {
            GeminiError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            GeminiError::Timeout(e.to_string())
        } else {
            GeminiError::Connection(e.to_string())
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GeminiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GeminiError::Connection(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| GeminiError::InvalidPayload(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════
// GeminiExtractor — the ExtractionModel implementation
// ═══════════════════════════════════════════════════════════

/// Production extraction model: prepares content per file type and runs the
/// fixed prompt + schema against the configured Gemini model.
pub struct GeminiExtractor {
    client: GeminiClient,
    model: String,
    poll_interval: Duration,
    poll_deadline: Duration,
}

impl GeminiExtractor {
    pub fn new(
        client: GeminiClient,
        model: impl Into<String>,
        poll_interval: Duration,
        poll_deadline: Duration,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            poll_interval,
            poll_deadline,
        }
    }
}

#[async_trait]
impl ExtractionModel for GeminiExtractor {
    async fn extract_pdf(
        &self,
        bytes: &[u8],
        file_name: &str,
        hash: &str,
    ) -> Result<ExtractedFields, ExtractionError> {
        pdf::extract_pdf_fields(
            &self.client,
            &self.model,
            bytes,
            file_name,
            hash,
            self.poll_interval,
            self.poll_deadline,
        )
        .await
    }

    async fn extract_text(&self, text: &str) -> Result<ExtractedFields, ExtractionError> {
        let parts = [
            Part::text(format!(
                "Extract proposal data from this spreadsheet:\n\n{text}"
            )),
            Part::text(EXTRACTION_SYSTEM_PROMPT),
        ];
        let raw = self.client.generate(&self.model, &parts).await?;
        parse_extraction(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_state_parses_provider_labels() {
        let state: FileState = serde_json::from_str("\"PROCESSING\"").unwrap();
        assert_eq!(state, FileState::Processing);
        let state: FileState = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(state, FileState::Active);
        let state: FileState = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(state, FileState::Failed);
        // Forward-compatible: unrecognized states do not fail the parse
        let state: FileState = serde_json::from_str("\"STATE_UNSPECIFIED\"").unwrap();
        assert_eq!(state, FileState::Unknown);
    }

    #[test]
    fn upload_response_parses() {
        let raw = r#"{"file": {"name": "files/abc123", "uri": "https://provider.test/files/abc123", "mimeType": "application/pdf", "state": "PROCESSING"}}"#;
        let parsed: UploadFileResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.file.name, "files/abc123");
        assert_eq!(parsed.file.state, FileState::Processing);
        assert_eq!(parsed.file.mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn parts_serialize_to_provider_shape() {
        let text = serde_json::to_value(Part::text("hello")).unwrap();
        assert_eq!(text, serde_json::json!({"text": "hello"}));

        let file = serde_json::to_value(Part::file("application/pdf", "https://f/1")).unwrap();
        assert_eq!(
            file,
            serde_json::json!({"fileData": {"mimeType": "application/pdf", "fileUri": "https://f/1"}})
        );
    }

    #[test]
    fn generate_request_declares_json_output_and_schema() {
        let parts = [Part::text("doc")];
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: &parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(value["generationConfig"]["responseSchema"]["required"].is_array());
        assert_eq!(value["contents"][0]["role"], "user");
    }

    #[test]
    fn response_text_extracts_first_candidate() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "{\"ok\":true}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response_text(parsed).unwrap(), "{\"ok\":true}");
    }

    #[test]
    fn empty_candidates_is_an_error() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            response_text(parsed),
            Err(GeminiError::EmptyResponse)
        ));

        let parsed: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(matches!(
            response_text(parsed),
            Err(GeminiError::EmptyResponse)
        ));
    }

    #[test]
    fn client_normalizes_base_url() {
        let client = GeminiClient::new("https://provider.test/", "k");
        assert_eq!(client.base_url(), "https://provider.test");
    }
}
