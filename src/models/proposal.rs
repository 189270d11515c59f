use chrono::NaiveDateTime;
use uuid::Uuid;

use super::enums::{ApprovalStatus, ProposalStatus};

/// One uploaded bid document and its processing state.
///
/// Identity is the sha-256 hash of the raw file bytes — `hash` is the
/// deduplication key and never changes, even across retries.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: Uuid,
    pub hash: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub file_url: Option<String>,
    pub status: ProposalStatus,
    pub approval_status: ApprovalStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
