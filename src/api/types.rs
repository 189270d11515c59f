//! Shared state and response shapes for the API layer.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    ApprovalStatus, ConfidenceLevel, ExtractionField, FieldName, FieldResult, Proposal,
    ProposalStatus,
};
use crate::pipeline::extraction::confidence::aggregate;
use crate::pipeline::{ExtractionQueue, Pipeline};
use crate::storage::BlobStore;

/// Shared context for all API routes: the persistence path plus the
/// process-wide clients, constructed once at startup and injected.
#[derive(Clone)]
pub struct ApiContext {
    pub db_path: PathBuf,
    pub blob: Arc<dyn BlobStore>,
    pub pipeline: Arc<Pipeline>,
    pub queue: Arc<ExtractionQueue>,
}

/// One proposal as the dashboard renders it: flattened field values plus
/// the derived view (overall confidence + review flag), recomputed on every
/// read — never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalView {
    pub id: Uuid,
    pub file_name: String,
    pub file_url: Option<String>,
    pub status: ProposalStatus,
    pub approval_status: ApprovalStatus,
    pub company_name: Option<String>,
    pub trade: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub review_needed: bool,
    /// HIGH / MEDIUM / LOW, or PENDING when nothing has been extracted yet.
    pub overall_confidence: &'static str,
    pub fields: BTreeMap<String, FieldResult>,
    pub created_at: NaiveDateTime,
}

fn confidence_label(level: ConfidenceLevel) -> &'static str {
    match level {
        ConfidenceLevel::High => "HIGH",
        ConfidenceLevel::Medium => "MEDIUM",
        ConfidenceLevel::Low => "LOW",
    }
}

/// Assemble the dashboard view of one proposal from its row and fields.
pub fn proposal_view(proposal: &Proposal, fields: &[ExtractionField]) -> ProposalView {
    let (overall_confidence, review_needed) = if fields.is_empty() {
        ("PENDING", false)
    } else {
        let summary = aggregate(fields.iter().map(|f| f.confidence));
        (confidence_label(summary.overall), summary.review_needed)
    };

    let lookup = |name: FieldName| {
        fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value.clone())
    };

    ProposalView {
        id: proposal.id,
        file_name: proposal.file_name.clone(),
        file_url: proposal.file_url.clone(),
        status: proposal.status,
        approval_status: proposal.approval_status,
        company_name: lookup(FieldName::CompanyName),
        trade: lookup(FieldName::Trade),
        contact_name: lookup(FieldName::ContactName),
        email: lookup(FieldName::Email),
        phone: lookup(FieldName::Phone),
        review_needed,
        overall_confidence,
        fields: fields
            .iter()
            .map(|f| (f.name.as_str().to_string(), FieldResult::from(f)))
            .collect(),
        created_at: proposal.created_at,
    }
}
