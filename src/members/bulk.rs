//! Multi-member operations. Each item is attempted on its own; failures are
//! tallied in a [`BulkReport`] and successful items are never rolled back.

use serde::Serialize;

use super::validate::{validate_new_member, validate_patch};
use super::{new_id, InvitationType, MemberPatch, NewMember};
use crate::error::{Error, Result};
use crate::storage::repository;
use crate::storage::Database;

/// Report returned after a bulk operation completes.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub operation: String,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// `(item, error)` for every failed item, in input order.
    pub failures: Vec<(String, String)>,
    pub status: BulkStatus,
}

impl BulkReport {
    /// Create a BulkReport with the status derived from the tallies.
    pub fn from_outcomes(operation: &str, succeeded: u64, failures: Vec<(String, String)>) -> Self {
        let failed = failures.len() as u64;
        let status = if failed == 0 {
            BulkStatus::Success
        } else if succeeded > 0 {
            BulkStatus::PartialFailure
        } else {
            BulkStatus::Failed
        };
        Self {
            operation: operation.to_string(),
            attempted: succeeded + failed,
            succeeded,
            failed,
            failures,
            status,
        }
    }

    /// One-line summary for a notification, e.g. "3 deleted, 1 failed".
    pub fn summary(&self) -> String {
        if self.failed == 0 {
            format!("{} {}", self.succeeded, self.operation)
        } else {
            format!("{} {}, {} failed", self.succeeded, self.operation, self.failed)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BulkStatus {
    Success,
    PartialFailure,
    Failed,
}

/// Delete members or invites by id. An id matching neither is a failure.
pub async fn delete_members(db: &Database, company_id: &str, ids: &[String]) -> Result<BulkReport> {
    let mut succeeded = 0;
    let mut failures = Vec::new();
    for id in ids {
        let result = db
            .writer()
            .call({
                let company_id = company_id.to_string();
                let id = id.clone();
                move |conn| {
                    if repository::delete_profile(conn, &company_id, &id)? {
                        return Ok(true);
                    }
                    repository::delete_invite(conn, &company_id, &id)
                }
            })
            .await;
        match result {
            Ok(true) => succeeded += 1,
            Ok(false) => failures.push((id.clone(), Error::NotFound(id.clone()).to_string())),
            Err(e) => {
                log::warn!("bulk delete of {id} failed: {e}");
                failures.push((id.clone(), e.to_string()));
            }
        }
    }
    let report = BulkReport::from_outcomes("deleted", succeeded, failures);
    log::info!("bulk delete for {company_id}: {}", report.summary());
    Ok(report)
}

/// Apply one patch to many members or invites. An invalid patch fails the
/// whole call before anything is written.
pub async fn update_members(
    db: &Database,
    company_id: &str,
    ids: &[String],
    patch: &MemberPatch,
) -> Result<BulkReport> {
    validate_patch(patch)?;

    let mut succeeded = 0;
    let mut failures = Vec::new();
    for id in ids {
        let result = db
            .writer()
            .call({
                let company_id = company_id.to_string();
                let id = id.clone();
                let patch = patch.clone();
                move |conn| {
                    if repository::update_profile(conn, &company_id, &id, &patch)? {
                        return Ok(true);
                    }
                    repository::update_invite(conn, &company_id, &id, &patch)
                }
            })
            .await;
        match result {
            Ok(true) => succeeded += 1,
            Ok(false) => failures.push((id.clone(), Error::NotFound(id.clone()).to_string())),
            Err(e) => {
                log::warn!("bulk update of {id} failed: {e}");
                failures.push((id.clone(), e.to_string()));
            }
        }
    }
    let report = BulkReport::from_outcomes("updated", succeeded, failures);
    log::info!("bulk update for {company_id}: {}", report.summary());
    Ok(report)
}

/// Parse a roster file: a JSON array of member rows.
pub fn parse_roster(json: &str) -> Result<Vec<NewMember>> {
    serde_json::from_str(json).map_err(|e| Error::validation("roster", e.to_string()))
}

/// Create a pre-registered invite per roster row. Rows that fail validation
/// or insertion are reported by position and name.
pub async fn import_roster(db: &Database, company_id: &str, rows: Vec<NewMember>) -> Result<BulkReport> {
    let mut succeeded = 0;
    let mut failures = Vec::new();
    for (i, row) in rows.into_iter().enumerate() {
        let label = format!("row {} ({} {})", i + 1, row.first_name.trim(), row.last_name.trim());
        if let Err(e) = validate_new_member(&row, false) {
            failures.push((label, e.to_string()));
            continue;
        }
        let pending = row.into_pending(new_id(), company_id, InvitationType::PreRegistered);
        let result = db
            .writer()
            .call(move |conn| repository::insert_invite(conn, &pending))
            .await;
        match result {
            Ok(()) => succeeded += 1,
            Err(e) => {
                log::warn!("import of {label} failed: {e}");
                failures.push((label, e.to_string()));
            }
        }
    }
    let report = BulkReport::from_outcomes("imported", succeeded, failures);
    log::info!("roster import for {company_id}: {}", report.summary());
    Ok(report)
}
