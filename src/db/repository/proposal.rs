use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{ApprovalStatus, Proposal, ProposalStatus};

const PROPOSAL_COLUMNS: &str =
    "id, hash, file_name, mime_type, file_url, status, approval_status, created_at, updated_at";

pub fn insert_proposal(conn: &Connection, proposal: &Proposal) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO proposals (id, hash, file_name, mime_type, file_url, status,
         approval_status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            proposal.id.to_string(),
            proposal.hash,
            proposal.file_name,
            proposal.mime_type,
            proposal.file_url,
            proposal.status.as_str(),
            proposal.approval_status.as_str(),
            format_timestamp(&proposal.created_at),
            format_timestamp(&proposal.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_proposal(conn: &Connection, id: &Uuid) -> Result<Option<Proposal>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], read_row);

    match result {
        Ok(row) => Ok(Some(proposal_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Look up a proposal by content hash — the deduplication fast path.
pub fn get_proposal_by_hash(
    conn: &Connection,
    hash: &str,
) -> Result<Option<Proposal>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE hash = ?1 LIMIT 1"
    ))?;
    let result = stmt.query_row(params![hash], read_row);

    match result {
        Ok(row) => Ok(Some(proposal_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Update only the lifecycle status of a proposal.
pub fn update_status(
    conn: &Connection,
    id: &Uuid,
    status: ProposalStatus,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE proposals SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), now_timestamp()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Proposal".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn update_approval_status(
    conn: &Connection,
    id: &Uuid,
    approval: ApprovalStatus,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE proposals SET approval_status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), approval.as_str(), now_timestamp()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Proposal".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Most recent proposals, optionally filtered by approval status.
/// The dashboard caps at 100; callers pass the cap explicitly.
pub fn list_recent(
    conn: &Connection,
    approval: Option<ApprovalStatus>,
    limit: u32,
) -> Result<Vec<Proposal>, DatabaseError> {
    let mut proposals = Vec::new();

    match approval {
        Some(approval) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROPOSAL_COLUMNS} FROM proposals
                 WHERE approval_status = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![approval.as_str(), limit], read_row)?;
            for row in rows {
                proposals.push(proposal_from_row(row?)?);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROPOSAL_COLUMNS} FROM proposals
                 ORDER BY created_at DESC, id DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], read_row)?;
            for row in rows {
                proposals.push(proposal_from_row(row?)?);
            }
        }
    }

    Ok(proposals)
}

/// Ids of proposals awaiting processing, oldest first.
pub fn pending_proposal_ids(conn: &Connection) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id FROM proposals WHERE status = ?1 ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![ProposalStatus::Pending.as_str()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut ids = Vec::new();
    for row in rows {
        let id_str = row?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
        ids.push(id);
    }
    Ok(ids)
}

pub(crate) fn now_timestamp() -> String {
    format_timestamp(&chrono::Utc::now().naive_utc())
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub(crate) fn parse_timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.6f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .unwrap_or_default()
}

// Internal row type for Proposal mapping
struct ProposalRow {
    id: String,
    hash: String,
    file_name: String,
    mime_type: Option<String>,
    file_url: Option<String>,
    status: String,
    approval_status: String,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProposalRow> {
    Ok(ProposalRow {
        id: row.get(0)?,
        hash: row.get(1)?,
        file_name: row.get(2)?,
        mime_type: row.get(3)?,
        file_url: row.get(4)?,
        status: row.get(5)?,
        approval_status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn proposal_from_row(row: ProposalRow) -> Result<Proposal, DatabaseError> {
    Ok(Proposal {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        hash: row.hash,
        file_name: row.file_name,
        mime_type: row.mime_type,
        file_url: row.file_url,
        status: ProposalStatus::from_str(&row.status)?,
        approval_status: ApprovalStatus::from_str(&row.approval_status)?,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}
