use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::access_log::{AccessLogEntry, NewAccessLog};
use crate::model::access_log_edit::{AccessLogEdit, NewAccessLogEdit};
use crate::model::employee::Employee;

pub mod mysql;

#[cfg(test)]
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The employee's ledger tail changed between read and guarded write.
    #[error("ledger tail moved for employee {0}")]
    TailMoved(u64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append-mostly attendance ledger. Rows are totally ordered per employee
/// by (timestamp, id).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn last_entry(&self, employee_id: u64) -> Result<Option<AccessLogEntry>, StoreError>;

    /// Append `entries` in order, all-or-nothing, iff the employee's current
    /// last entry id still equals `expected_tail`. Implementations must
    /// serialize concurrent calls for the same employee; a failed tail check
    /// returns [`StoreError::TailMoved`] with nothing written.
    async fn append_entries(
        &self,
        employee_id: u64,
        expected_tail: Option<u64>,
        entries: Vec<NewAccessLog>,
    ) -> Result<Vec<AccessLogEntry>, StoreError>;

    /// Entries for one employee with `from <= timestamp < to`, ascending.
    async fn entries_in_range(
        &self,
        organization_id: u64,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AccessLogEntry>, StoreError>;

    /// Unscoped fetch; organization checks are the caller's concern.
    async fn entry_by_id(&self, access_log_id: u64) -> Result<Option<AccessLogEntry>, StoreError>;
}

/// Tamper-evident edit history for ledger timestamps.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Record the edit and apply the timestamp mutation to the ledger row.
    /// The audit insert must land before the row update so the ledger can
    /// never show as edited without its audit record.
    async fn apply_time_edit(&self, edit: NewAccessLogEdit) -> Result<AccessLogEdit, StoreError>;

    /// All edits of one ledger row in `created_at` order (oldest first).
    async fn edits_for_entry(&self, access_log_id: u64) -> Result<Vec<AccessLogEdit>, StoreError>;
}

/// Read side of the employee directory.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn find_by_id(
        &self,
        organization_id: u64,
        employee_id: u64,
    ) -> Result<Option<Employee>, StoreError>;

    async fn find_by_face_token(
        &self,
        organization_id: u64,
        face_token: &str,
    ) -> Result<Option<Employee>, StoreError>;
}
