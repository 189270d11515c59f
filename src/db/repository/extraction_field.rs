use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{
    ApprovalStatus, ConfidenceLevel, ExtractedFields, ExtractionField, FieldName, FieldSource,
    ProposalStatus,
};

use super::proposal::{now_timestamp, parse_timestamp};

/// Reasoning stamped on every manual override.
pub const USER_EDIT_REASONING: &str = "Manual user edit";

/// One field write: everything except identity and timestamps.
#[derive(Debug, Clone)]
pub struct FieldWrite<'a> {
    pub value: Option<&'a str>,
    pub confidence: ConfidenceLevel,
    pub reasoning: &'a str,
    pub source: FieldSource,
}

/// Upsert a single extraction field, keyed on (proposal_id, name).
/// The UNIQUE constraint guarantees at most one row per pair.
pub fn upsert_field(
    conn: &Connection,
    proposal_id: &Uuid,
    name: FieldName,
    write: &FieldWrite<'_>,
) -> Result<(), DatabaseError> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO extraction_fields
         (id, proposal_id, name, value, confidence, reasoning, source, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
         ON CONFLICT(proposal_id, name) DO UPDATE SET
           value = excluded.value,
           confidence = excluded.confidence,
           reasoning = excluded.reasoning,
           source = excluded.source,
           updated_at = excluded.updated_at",
        params![
            Uuid::new_v4().to_string(),
            proposal_id.to_string(),
            name.as_str(),
            write.value,
            write.confidence.as_str(),
            write.reasoning,
            write.source.as_str(),
            now,
        ],
    )?;
    Ok(())
}

/// All extraction fields for a proposal, in field-name order.
pub fn fields_for_proposal(
    conn: &Connection,
    proposal_id: &Uuid,
) -> Result<Vec<ExtractionField>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, proposal_id, name, value, confidence, reasoning, source,
                created_at, updated_at
         FROM extraction_fields WHERE proposal_id = ?1 ORDER BY name ASC",
    )?;

    let rows = stmt.query_map(params![proposal_id.to_string()], |row| {
        Ok(FieldRow {
            id: row.get(0)?,
            proposal_id: row.get(1)?,
            name: row.get(2)?,
            value: row.get(3)?,
            confidence: row.get(4)?,
            reasoning: row.get(5)?,
            source: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    })?;

    let mut fields = Vec::new();
    for row in rows {
        fields.push(field_from_row(row?)?);
    }
    Ok(fields)
}

/// Commit one extraction run: upsert all five fields (source = AI) and mark
/// the proposal completed, in a single transaction. Either the dashboard
/// sees the full five-field result with status completed, or nothing changed.
pub fn store_extraction(
    conn: &mut Connection,
    proposal_id: &Uuid,
    extracted: &ExtractedFields,
) -> Result<(), DatabaseError> {
    let tx = conn.transaction()?;

    for (name, field) in extracted.iter() {
        let write = FieldWrite {
            value: field.value.as_deref(),
            confidence: field.confidence,
            reasoning: &field.reasoning,
            source: FieldSource::Ai,
        };
        upsert_field(&tx, proposal_id, name, &write)?;
    }

    let rows = tx.execute(
        "UPDATE proposals SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            proposal_id.to_string(),
            ProposalStatus::Completed.as_str(),
            now_timestamp(),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Proposal".into(),
            id: proposal_id.to_string(),
        });
    }

    tx.commit()?;
    Ok(())
}

/// Apply manual field overrides (and an optional approval change) in one
/// transaction. Overrides always land as source = USER, confidence = HIGH,
/// and never touch the proposal's lifecycle status.
pub fn apply_user_overrides(
    conn: &mut Connection,
    proposal_id: &Uuid,
    updates: &[(FieldName, Option<String>)],
    approval: Option<ApprovalStatus>,
) -> Result<(), DatabaseError> {
    let tx = conn.transaction()?;

    let exists: bool = tx
        .query_row(
            "SELECT 1 FROM proposals WHERE id = ?1",
            params![proposal_id.to_string()],
            |_| Ok(true),
        )
        .unwrap_or(false);
    if !exists {
        return Err(DatabaseError::NotFound {
            entity_type: "Proposal".into(),
            id: proposal_id.to_string(),
        });
    }

    for (name, value) in updates {
        let write = FieldWrite {
            value: value.as_deref(),
            confidence: ConfidenceLevel::High,
            reasoning: USER_EDIT_REASONING,
            source: FieldSource::User,
        };
        upsert_field(&tx, proposal_id, *name, &write)?;
    }

    if let Some(approval) = approval {
        tx.execute(
            "UPDATE proposals SET approval_status = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                proposal_id.to_string(),
                approval.as_str(),
                now_timestamp(),
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

// Internal row type for ExtractionField mapping
struct FieldRow {
    id: String,
    proposal_id: String,
    name: String,
    value: Option<String>,
    confidence: String,
    reasoning: String,
    source: String,
    created_at: String,
    updated_at: String,
}

fn field_from_row(row: FieldRow) -> Result<ExtractionField, DatabaseError> {
    Ok(ExtractionField {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        proposal_id: Uuid::parse_str(&row.proposal_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        name: FieldName::from_str(&row.name)?,
        value: row.value,
        confidence: ConfidenceLevel::from_str(&row.confidence)?,
        reasoning: row.reasoning,
        source: FieldSource::from_str(&row.source)?,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}
