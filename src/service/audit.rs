use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::model::access_log_edit::{AccessLogEdit, NewAccessLogEdit};
use crate::service::error::AuditError;
use crate::store::{AuditStore, LedgerStore};
use crate::utils::time::{parse_hhmm, Clock, OrgTimeZone};

/// Reasons shorter than this (after trimming) are rejected.
pub const MIN_REASON_LEN: usize = 10;

#[derive(Debug)]
pub struct TimeEditOutcome {
    pub previous_timestamp: DateTime<Utc>,
    pub new_timestamp: DateTime<Utc>,
    pub edit: AccessLogEdit,
}

/// Applies administrator corrections to ledger timestamps, recording every
/// change in the append-only edit history before the row is touched.
pub struct AuditService {
    ledger: Arc<dyn LedgerStore>,
    audit: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
    tz: OrgTimeZone,
}

impl AuditService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        audit: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
        tz: OrgTimeZone,
    ) -> Self {
        Self {
            ledger,
            audit,
            clock,
            tz,
        }
    }

    /// Replace the time-of-day of an entry, keeping its organization-local
    /// calendar date. An edit can never move an entry to another date.
    pub async fn edit_entry_time(
        &self,
        access_log_id: u64,
        new_local_time: &str,
        reason: &str,
        admin_id: u64,
        organization_id: u64,
    ) -> Result<TimeEditOutcome, AuditError> {
        let Some(new_time) = parse_hhmm(new_local_time) else {
            return Err(AuditError::Validation {
                field: "new_time",
                message: "must be a valid 24-hour HH:MM time".into(),
            });
        };

        let reason = reason.trim();
        if reason.chars().count() < MIN_REASON_LEN {
            return Err(AuditError::Validation {
                field: "reason",
                message: format!("must be at least {} characters", MIN_REASON_LEN),
            });
        }

        let entry = self
            .ledger
            .entry_by_id(access_log_id)
            .await?
            .ok_or(AuditError::NotFound)?;

        // Cross-organization access surfaces as not-found: existence of
        // another tenant's records is never confirmed.
        if entry.organization_id != organization_id {
            return Err(AuditError::NotFound);
        }

        let date = self.tz.local_date(entry.timestamp);
        let new_timestamp = self.tz.at(date, new_time);

        let edit = self
            .audit
            .apply_time_edit(NewAccessLogEdit {
                organization_id: entry.organization_id,
                access_log_id,
                admin_id,
                previous_timestamp: entry.timestamp,
                new_timestamp,
                reason: reason.to_string(),
                edited_at: self.clock.now(),
            })
            .await?;

        Ok(TimeEditOutcome {
            previous_timestamp: entry.timestamp,
            new_timestamp,
            edit,
        })
    }

    /// Full edit history of one entry, oldest first. Same organization
    /// masking as `edit_entry_time`.
    pub async fn edit_history(
        &self,
        access_log_id: u64,
        organization_id: u64,
    ) -> Result<Vec<AccessLogEdit>, AuditError> {
        let entry = self
            .ledger
            .entry_by_id(access_log_id)
            .await?
            .ok_or(AuditError::NotFound)?;

        if entry.organization_id != organization_id {
            return Err(AuditError::NotFound);
        }

        Ok(self.audit.edits_for_entry(access_log_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::access_log::{ActionKind, NewAccessLog};
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn bogota() -> OrgTimeZone {
        OrgTimeZone::from_offset_minutes(-300).unwrap()
    }

    fn service(store: Arc<MemoryStore>, now: DateTime<Utc>) -> AuditService {
        AuditService::new(store.clone(), store, Arc::new(FixedClock(now)), bogota())
    }

    /// Seed one check-in at 09:00 local (14:00Z) and return its id.
    async fn seed_entry(store: &MemoryStore, organization_id: u64) -> u64 {
        let entries = store
            .append_entries(
                7,
                None,
                vec![NewAccessLog {
                    organization_id,
                    employee_id: 7,
                    timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap(),
                    action: ActionKind::CheckIn,
                    auto_generated: false,
                }],
            )
            .await
            .unwrap();
        entries[0].id
    }

    #[tokio::test]
    async fn edit_records_audit_then_updates_entry() {
        let store = Arc::new(MemoryStore::new());
        let entry_id = seed_entry(&store, 1).await;
        let edited_at = Utc.with_ymd_and_hms(2024, 1, 3, 15, 0, 0).unwrap();
        let svc = service(store.clone(), edited_at);

        let outcome = svc
            .edit_entry_time(
                entry_id,
                "08:45",
                "Kiosk offline, employee showed security footage timestamp",
                3,
                1,
            )
            .await
            .unwrap();

        // 08:45 local on the entry's original date (Jan 2) is 13:45Z.
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 13, 45, 0).unwrap();
        assert_eq!(outcome.new_timestamp, expected);
        assert_eq!(
            outcome.previous_timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap()
        );

        let entry = store.entry_by_id(entry_id).await.unwrap().unwrap();
        assert_eq!(entry.timestamp, expected);
        assert!(entry.edited_by_admin);
        assert_eq!(entry.edited_by, Some(3));
        assert_eq!(entry.edited_at, Some(edited_at));

        let history = svc.edit_history(entry_id, 1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_timestamp, outcome.previous_timestamp);
        assert_eq!(history[0].new_timestamp, entry.timestamp);
    }

    #[tokio::test]
    async fn history_tracks_successive_edits_in_order() {
        let store = Arc::new(MemoryStore::new());
        let entry_id = seed_entry(&store, 1).await;

        let first = service(store.clone(), Utc.with_ymd_and_hms(2024, 1, 3, 15, 0, 0).unwrap());
        first
            .edit_entry_time(entry_id, "08:45", "Kiosk clock was running ahead", 3, 1)
            .await
            .unwrap();

        let second = service(store.clone(), Utc.with_ymd_and_hms(2024, 1, 4, 15, 0, 0).unwrap());
        second
            .edit_entry_time(entry_id, "09:15", "Correction reverted after review", 4, 1)
            .await
            .unwrap();

        let history = second.edit_history(entry_id, 1).await.unwrap();
        assert_eq!(history.len(), 2);
        // Each record's previous value chains to the one before it, and the
        // newest record matches the entry's current timestamp.
        assert_eq!(history[1].previous_timestamp, history[0].new_timestamp);
        let entry = store.entry_by_id(entry_id).await.unwrap().unwrap();
        assert_eq!(history.last().unwrap().new_timestamp, entry.timestamp);
    }

    #[tokio::test]
    async fn short_reason_is_rejected_without_writes() {
        let store = Arc::new(MemoryStore::new());
        let entry_id = seed_entry(&store, 1).await;
        let svc = service(store.clone(), Utc::now());

        let err = svc
            .edit_entry_time(entry_id, "08:45", "  typo   ", 3, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::Validation { field: "reason", .. }));
        assert!(store.all_edits().is_empty());
        let entry = store.entry_by_id(entry_id).await.unwrap().unwrap();
        assert!(!entry.edited_by_admin);
    }

    #[tokio::test]
    async fn malformed_time_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let entry_id = seed_entry(&store, 1).await;
        let svc = service(store.clone(), Utc::now());

        for bad in ["25:00", "8.45", "08:45:30", ""] {
            let err = svc
                .edit_entry_time(entry_id, bad, "a perfectly valid reason", 3, 1)
                .await
                .unwrap_err();
            assert!(matches!(err, AuditError::Validation { field: "new_time", .. }));
        }
        assert!(store.all_edits().is_empty());
    }

    #[tokio::test]
    async fn cross_org_edit_looks_like_missing_entry() {
        let store = Arc::new(MemoryStore::new());
        let entry_id = seed_entry(&store, 1).await;
        let svc = service(store.clone(), Utc::now());

        // Admin of organization 2 targeting organization 1's entry.
        let cross_org = svc
            .edit_entry_time(entry_id, "08:45", "a perfectly valid reason", 3, 2)
            .await
            .unwrap_err();

        // Same id, nonexistent entry.
        let missing = svc
            .edit_entry_time(9999, "08:45", "a perfectly valid reason", 3, 2)
            .await
            .unwrap_err();

        assert!(matches!(cross_org, AuditError::NotFound));
        assert!(matches!(missing, AuditError::NotFound));
        assert!(store.all_edits().is_empty());

        let history = svc.edit_history(entry_id, 2).await.unwrap_err();
        assert!(matches!(history, AuditError::NotFound));
    }
}
