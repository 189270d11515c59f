use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConfidenceLevel, FieldName, FieldSource};

/// One persisted extraction row: a single (proposal, field name) pair.
/// At most one row exists per pair — writes are upserts on that composite.
#[derive(Debug, Clone)]
pub struct ExtractionField {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub name: FieldName,
    pub value: Option<String>,
    pub confidence: ConfidenceLevel,
    pub reasoning: String,
    pub source: FieldSource,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One field as returned by the model (or re-read from storage):
/// value, a confidence label, and a one-sentence justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResult {
    #[serde(default)]
    pub value: Option<String>,
    pub confidence: ConfidenceLevel,
    pub reasoning: String,
}

impl From<&ExtractionField> for FieldResult {
    fn from(field: &ExtractionField) -> Self {
        Self {
            value: field.value.clone(),
            confidence: field.confidence,
            reasoning: field.reasoning.clone(),
        }
    }
}

/// The complete five-field result of one extraction run.
///
/// All five fields are required: a response missing any of them fails
/// validation upstream instead of being patched with defaults here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub company_name: FieldResult,
    pub contact_name: FieldResult,
    pub email: FieldResult,
    pub phone: FieldResult,
    pub trade: FieldResult,
}

impl ExtractedFields {
    pub fn get(&self, name: FieldName) -> &FieldResult {
        match name {
            FieldName::CompanyName => &self.company_name,
            FieldName::ContactName => &self.contact_name,
            FieldName::Email => &self.email,
            FieldName::Phone => &self.phone,
            FieldName::Trade => &self.trade,
        }
    }

    /// Iterate the five fields in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldResult)> {
        FieldName::all().iter().map(|name| (*name, self.get(*name)))
    }

    pub fn confidences(&self) -> Vec<ConfidenceLevel> {
        self.iter().map(|(_, f)| f.confidence).collect()
    }
}
