//! In-memory store used by the service tests. Mirrors the MySQL store's
//! guarantees: guarded appends are atomic under one lock, audit records are
//! written before the ledger row mutation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

use super::{AuditStore, EmployeeStore, LedgerStore, StoreError};
use crate::model::access_log::{AccessLogEntry, NewAccessLog};
use crate::model::access_log_edit::{AccessLogEdit, NewAccessLogEdit};
use crate::model::employee::Employee;

#[derive(Default)]
struct Inner {
    logs: Vec<AccessLogEntry>,
    edits: Vec<AccessLogEdit>,
    employees: Vec<Employee>,
    next_log_id: u64,
    next_edit_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employee(self, employee: Employee) -> Self {
        self.inner.lock().unwrap().employees.push(employee);
        self
    }

    pub fn all_entries(&self) -> Vec<AccessLogEntry> {
        let inner = self.inner.lock().unwrap();
        let mut logs = inner.logs.clone();
        logs.sort_by_key(|e| (e.timestamp, e.id));
        logs
    }

    pub fn all_edits(&self) -> Vec<AccessLogEdit> {
        self.inner.lock().unwrap().edits.clone()
    }

    fn tail_of(inner: &Inner, employee_id: u64) -> Option<AccessLogEntry> {
        inner
            .logs
            .iter()
            .filter(|e| e.employee_id == employee_id)
            .max_by_key(|e| (e.timestamp, e.id))
            .cloned()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn last_entry(&self, employee_id: u64) -> Result<Option<AccessLogEntry>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(Self::tail_of(&inner, employee_id))
    }

    async fn append_entries(
        &self,
        employee_id: u64,
        expected_tail: Option<u64>,
        entries: Vec<NewAccessLog>,
    ) -> Result<Vec<AccessLogEntry>, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let tail = Self::tail_of(&inner, employee_id).map(|e| e.id);
        if tail != expected_tail {
            return Err(StoreError::TailMoved(employee_id));
        }

        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            inner.next_log_id += 1;
            let row = AccessLogEntry {
                id: inner.next_log_id,
                organization_id: entry.organization_id,
                employee_id: entry.employee_id,
                timestamp: entry.timestamp,
                action: entry.action,
                auto_generated: entry.auto_generated,
                edited_by_admin: false,
                edited_at: None,
                edited_by: None,
            };
            inner.logs.push(row.clone());
            inserted.push(row);
        }

        Ok(inserted)
    }

    async fn entries_in_range(
        &self,
        organization_id: u64,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AccessLogEntry>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<_> = inner
            .logs
            .iter()
            .filter(|e| {
                e.organization_id == organization_id
                    && e.employee_id == employee_id
                    && e.timestamp >= from
                    && e.timestamp < to
            })
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.timestamp, e.id));
        Ok(entries)
    }

    async fn entry_by_id(&self, access_log_id: u64) -> Result<Option<AccessLogEntry>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.logs.iter().find(|e| e.id == access_log_id).cloned())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn apply_time_edit(&self, edit: NewAccessLogEdit) -> Result<AccessLogEdit, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        inner.next_edit_id += 1;
        let record = AccessLogEdit {
            id: inner.next_edit_id,
            organization_id: edit.organization_id,
            access_log_id: edit.access_log_id,
            admin_id: edit.admin_id,
            previous_timestamp: edit.previous_timestamp,
            new_timestamp: edit.new_timestamp,
            reason: edit.reason,
            created_at: edit.edited_at,
        };
        // Audit record first, then the ledger row mutation.
        inner.edits.push(record.clone());

        if let Some(row) = inner.logs.iter_mut().find(|e| e.id == edit.access_log_id) {
            row.timestamp = edit.new_timestamp;
            row.edited_by_admin = true;
            row.edited_at = Some(edit.edited_at);
            row.edited_by = Some(edit.admin_id);
        }

        Ok(record)
    }

    async fn edits_for_entry(&self, access_log_id: u64) -> Result<Vec<AccessLogEdit>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut edits: Vec<_> = inner
            .edits
            .iter()
            .filter(|e| e.access_log_id == access_log_id)
            .cloned()
            .collect();
        edits.sort_by_key(|e| (e.created_at, e.id));
        Ok(edits)
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn find_by_id(
        &self,
        organization_id: u64,
        employee_id: u64,
    ) -> Result<Option<Employee>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .employees
            .iter()
            .find(|e| e.organization_id == organization_id && e.id == employee_id)
            .cloned())
    }

    async fn find_by_face_token(
        &self,
        organization_id: u64,
        face_token: &str,
    ) -> Result<Option<Employee>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .employees
            .iter()
            .find(|e| e.organization_id == organization_id && e.face_token == face_token)
            .cloned())
    }
}
