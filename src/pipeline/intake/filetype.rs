use serde::{Deserialize, Serialize};

/// The closed set of document kinds the pipeline can dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Pdf,
    Excel,
    Unsupported,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "excel",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_XLSX: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_XLS: &str = "application/vnd.ms-excel";

/// Resolve a document kind from declared MIME type and filename.
///
/// An exact MIME match wins; an absent or unrecognized MIME type falls back
/// to the filename extension. Anything else is Unsupported.
pub fn resolve_file_type(file_name: &str, mime_type: Option<&str>) -> FileType {
    match mime_type {
        Some(MIME_PDF) => return FileType::Pdf,
        Some(MIME_XLSX) | Some(MIME_XLS) => return FileType::Excel,
        _ => {}
    }

    let lower = file_name.to_lowercase();
    if lower.ends_with(".pdf") {
        FileType::Pdf
    } else if lower.ends_with(".xls") || lower.ends_with(".xlsx") {
        FileType::Excel
    } else {
        FileType::Unsupported
    }
}
