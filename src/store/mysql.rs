use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use super::{AuditStore, EmployeeStore, LedgerStore, StoreError};
use crate::model::access_log::{AccessLogEntry, NewAccessLog};
use crate::model::access_log_edit::{AccessLogEdit, NewAccessLogEdit};
use crate::model::employee::Employee;

/// MySQL-backed store. All queries are runtime-bound; row types derive
/// `FromRow` so joined/ad-hoc results always normalize to a single typed
/// record.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for MySqlStore {
    async fn last_entry(&self, employee_id: u64) -> Result<Option<AccessLogEntry>, StoreError> {
        let entry = sqlx::query_as::<_, AccessLogEntry>(
            r#"
            SELECT id, organization_id, employee_id, timestamp, action,
                   auto_generated, edited_by_admin, edited_at, edited_by
            FROM access_logs
            WHERE employee_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn append_entries(
        &self,
        employee_id: u64,
        expected_tail: Option<u64>,
        entries: Vec<NewAccessLog>,
    ) -> Result<Vec<AccessLogEntry>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the employee serializes the read-decide-write
        // sequence: two concurrent requests for the same employee queue
        // here instead of both passing the tail check.
        sqlx::query("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(employee_id)
            .fetch_optional(&mut *tx)
            .await?;

        let tail: Option<u64> = sqlx::query_scalar(
            r#"
            SELECT id FROM access_logs
            WHERE employee_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?;

        if tail != expected_tail {
            return Err(StoreError::TailMoved(employee_id));
        }

        let mut inserted = Vec::with_capacity(entries.len());

        for entry in entries {
            let result = sqlx::query(
                r#"
                INSERT INTO access_logs
                    (organization_id, employee_id, timestamp, action, auto_generated)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.organization_id)
            .bind(entry.employee_id)
            .bind(entry.timestamp)
            .bind(entry.action)
            .bind(entry.auto_generated)
            .execute(&mut *tx)
            .await?;

            inserted.push(AccessLogEntry {
                id: result.last_insert_id(),
                organization_id: entry.organization_id,
                employee_id: entry.employee_id,
                timestamp: entry.timestamp,
                action: entry.action,
                auto_generated: entry.auto_generated,
                edited_by_admin: false,
                edited_at: None,
                edited_by: None,
            });
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn entries_in_range(
        &self,
        organization_id: u64,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AccessLogEntry>, StoreError> {
        let entries = sqlx::query_as::<_, AccessLogEntry>(
            r#"
            SELECT id, organization_id, employee_id, timestamp, action,
                   auto_generated, edited_by_admin, edited_at, edited_by
            FROM access_logs
            WHERE organization_id = ? AND employee_id = ?
              AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(organization_id)
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn entry_by_id(&self, access_log_id: u64) -> Result<Option<AccessLogEntry>, StoreError> {
        let entry = sqlx::query_as::<_, AccessLogEntry>(
            r#"
            SELECT id, organization_id, employee_id, timestamp, action,
                   auto_generated, edited_by_admin, edited_at, edited_by
            FROM access_logs
            WHERE id = ?
            "#,
        )
        .bind(access_log_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }
}

#[async_trait]
impl AuditStore for MySqlStore {
    async fn apply_time_edit(&self, edit: NewAccessLogEdit) -> Result<AccessLogEdit, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Audit insert first; the ledger row update only happens after this
        // statement succeeds.
        let result = sqlx::query(
            r#"
            INSERT INTO access_log_edits
                (organization_id, access_log_id, admin_id,
                 previous_timestamp, new_timestamp, reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(edit.organization_id)
        .bind(edit.access_log_id)
        .bind(edit.admin_id)
        .bind(edit.previous_timestamp)
        .bind(edit.new_timestamp)
        .bind(&edit.reason)
        .bind(edit.edited_at)
        .execute(&mut *tx)
        .await?;

        let edit_id = result.last_insert_id();

        sqlx::query(
            r#"
            UPDATE access_logs
            SET timestamp = ?, edited_by_admin = 1, edited_at = ?, edited_by = ?
            WHERE id = ?
            "#,
        )
        .bind(edit.new_timestamp)
        .bind(edit.edited_at)
        .bind(edit.admin_id)
        .bind(edit.access_log_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AccessLogEdit {
            id: edit_id,
            organization_id: edit.organization_id,
            access_log_id: edit.access_log_id,
            admin_id: edit.admin_id,
            previous_timestamp: edit.previous_timestamp,
            new_timestamp: edit.new_timestamp,
            reason: edit.reason,
            created_at: edit.edited_at,
        })
    }

    async fn edits_for_entry(&self, access_log_id: u64) -> Result<Vec<AccessLogEdit>, StoreError> {
        let edits = sqlx::query_as::<_, AccessLogEdit>(
            r#"
            SELECT id, organization_id, access_log_id, admin_id,
                   previous_timestamp, new_timestamp, reason, created_at
            FROM access_log_edits
            WHERE access_log_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(access_log_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(edits)
    }
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn find_by_id(
        &self,
        organization_id: u64,
        employee_id: u64,
    ) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, organization_id, employee_code, display_name,
                   face_token, status, created_at
            FROM employees
            WHERE organization_id = ? AND id = ?
            "#,
        )
        .bind(organization_id)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    async fn find_by_face_token(
        &self,
        organization_id: u64,
        face_token: &str,
    ) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, organization_id, employee_code, display_name,
                   face_token, status, created_at
            FROM employees
            WHERE organization_id = ? AND face_token = ?
            "#,
        )
        .bind(organization_id)
        .bind(face_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }
}
