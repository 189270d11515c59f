//! The structured-output contract with the model provider.
//!
//! Two halves: the schema we declare to the provider so generation is
//! constrained, and the strict typed parse we run on whatever comes back.
//! A response that does not deserialize into [`ExtractedFields`] — missing
//! field, unknown confidence label, not JSON at all — is a fatal error for
//! the item, never silently defaulted.

use serde_json::{json, Value};

use crate::models::ExtractedFields;

use super::ExtractionError;

/// Response schema declared to the provider (its uppercase type names).
/// All five fields are required; only the `value` key may be null.
pub fn response_schema() -> Value {
    json!({
        "description": "Construction data",
        "type": "OBJECT",
        "properties": {
            "companyName": field_schema(),
            "contactName": field_schema(),
            "email": field_schema(),
            "phone": field_schema(),
            "trade": field_schema(),
        },
        "required": ["companyName", "contactName", "email", "phone", "trade"],
    })
}

fn field_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "value": { "type": "STRING", "nullable": true },
            "confidence": { "type": "STRING", "nullable": false },
            "reasoning": { "type": "STRING", "nullable": false },
        },
        "required": ["confidence", "reasoning"],
    })
}

/// Validate and parse a raw model response into the five typed fields.
pub fn parse_extraction(raw: &str) -> Result<ExtractedFields, ExtractionError> {
    serde_json::from_str(raw).map_err(|e| ExtractionError::InvalidResponse(e.to_string()))
}
