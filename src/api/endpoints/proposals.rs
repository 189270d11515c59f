//! Proposal endpoints: list, process, manual update, retry.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{proposal_view, ApiContext, ProposalView};
use crate::db::repository::{
    apply_user_overrides, fields_for_proposal, list_recent, update_status,
};
use crate::db::sqlite::open_database;
use crate::models::{ApprovalStatus, FieldName, ProposalStatus};
use crate::pipeline::ProcessOutcome;

/// Dashboard page size: at most this many most-recent proposals.
const LIST_LIMIT: u32 = 100;

// ── List ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListQuery {
    /// Optional approval filter (PENDING / APPROVED / REJECTED).
    pub approval: Option<ApprovalStatus>,
}

/// `GET /api/proposals[?approval=...]`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProposalView>>, ApiError> {
    let conn = open_database(&ctx.db_path).map_err(ApiError::from)?;

    let proposals = list_recent(&conn, query.approval, LIST_LIMIT).map_err(ApiError::from)?;
    let mut views = Vec::with_capacity(proposals.len());
    for proposal in &proposals {
        let fields = fields_for_proposal(&conn, &proposal.id).map_err(ApiError::from)?;
        views.push(proposal_view(proposal, &fields));
    }

    Ok(Json(views))
}

// ── Process ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ProcessOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessResponse {
    fn ok(data: ProcessOutcome) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// `POST /api/proposals/:id/process` — run extraction for one proposal.
///
/// Pipeline failures come back as `{success: false}` payloads: the proposal
/// is already marked failed and the dashboard offers a retry. The in-flight
/// claim is shared with the background workers, so a proposal cannot be
/// processed twice concurrently.
pub async fn process(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Json<ProcessResponse> {
    let Some(_ticket) = ctx.queue.try_claim(id) else {
        return Json(ProcessResponse::failed("Proposal is already being processed"));
    };

    match ctx.pipeline.process(&id).await {
        Ok(outcome) => Json(ProcessResponse::ok(outcome)),
        Err(e) => Json(ProcessResponse::failed(e.user_message())),
    }
}

// ── Manual update ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Field-name → value overrides; null clears the value.
    #[serde(default)]
    pub fields: BTreeMap<String, Option<String>>,
    pub approval_status: Option<ApprovalStatus>,
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub success: bool,
}

/// `PATCH /api/proposals/:id` — manual field overrides and/or approval.
/// Overrides always land as source USER with HIGH confidence and leave the
/// lifecycle status alone.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let mut updates = Vec::with_capacity(request.fields.len());
    for (name, value) in &request.fields {
        let name = FieldName::from_str(name)
            .map_err(|_| ApiError::BadRequest(format!("Unknown field name: {name}")))?;
        updates.push((name, value.clone()));
    }

    if updates.is_empty() && request.approval_status.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }

    let mut conn = open_database(&ctx.db_path).map_err(ApiError::from)?;
    apply_user_overrides(&mut conn, &id, &updates, request.approval_status)
        .map_err(ApiError::from)?;

    Ok(Json(UpdateResponse { success: true }))
}

// ── Retry ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RetryResponse {
    pub success: bool,
}

/// `POST /api/proposals/:id/retry` — reset to PENDING so the background
/// scan re-attempts extraction from scratch.
pub async fn retry(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<RetryResponse>, ApiError> {
    let conn = open_database(&ctx.db_path).map_err(ApiError::from)?;
    update_status(&conn, &id, ProposalStatus::Pending).map_err(ApiError::from)?;

    tracing::info!(proposal_id = %id, "Proposal re-queued for extraction");
    Ok(Json(RetryResponse { success: true }))
}
