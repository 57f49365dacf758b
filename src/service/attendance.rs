use chrono::NaiveTime;
use std::sync::Arc;

use crate::model::access_log::{AccessLogEntry, ActionKind, NewAccessLog};
use crate::model::employee::Employee;
use crate::service::error::AccessError;
use crate::store::{LedgerStore, StoreError};
use crate::utils::time::{Clock, OrgTimeZone};

/// Successful registration: the human-initiated entry plus whether a
/// synthesized check-out was inserted before it.
#[derive(Debug)]
pub struct AccessRegistered {
    pub entry: AccessLogEntry,
    pub auto_close_generated: bool,
}

/// Decides what ledger mutation results from a recognized employee
/// requesting a check-in/check-out. Storage and clock are injected; the
/// service holds no ledger state of its own.
pub struct AttendanceService {
    ledger: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    tz: OrgTimeZone,
    /// Local wall-clock time stamped on synthesized check-outs. A policy
    /// constant, not a measured exit time.
    auto_close_time: NaiveTime,
}

impl AttendanceService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        tz: OrgTimeZone,
        auto_close_time: NaiveTime,
    ) -> Self {
        Self {
            ledger,
            clock,
            tz,
            auto_close_time,
        }
    }

    /// Register a check-in/check-out for an already-resolved employee.
    ///
    /// The read-decide-write sequence runs against a guarded append: if
    /// another request for the same employee lands in between, the store
    /// reports a moved tail and the decision is recomputed once against
    /// the new tail. At most one action is ever accepted per employee at a
    /// time.
    pub async fn register_access(
        &self,
        employee: &Employee,
        action: ActionKind,
    ) -> Result<AccessRegistered, AccessError> {
        let now = self.clock.now();

        for _ in 0..2 {
            let last = self.ledger.last_entry(employee.id).await?;

            let mut batch = Vec::with_capacity(2);
            let mut auto_close_generated = false;

            if let Some(last) = &last {
                if last.action == action {
                    let last_day = self.tz.local_date(last.timestamp);
                    let today = self.tz.local_date(now);

                    if action == ActionKind::CheckIn && last_day < today {
                        // Unclosed check-in from an earlier day: close it
                        // at the configured end-of-day before accepting
                        // the new check-in. Same-day repeats fall through
                        // to duplicate rejection.
                        batch.push(NewAccessLog {
                            organization_id: employee.organization_id,
                            employee_id: employee.id,
                            timestamp: self.tz.at(last_day, self.auto_close_time),
                            action: ActionKind::CheckOut,
                            auto_generated: true,
                        });
                        auto_close_generated = true;
                    } else {
                        return Err(AccessError::DuplicateAction {
                            action,
                            last_at: self.tz.to_local(last.timestamp),
                        });
                    }
                }
            }

            batch.push(NewAccessLog {
                organization_id: employee.organization_id,
                employee_id: employee.id,
                timestamp: now,
                action,
                auto_generated: false,
            });

            let expected_tail = last.as_ref().map(|l| l.id);
            match self.ledger.append_entries(employee.id, expected_tail, batch).await {
                Ok(entries) => {
                    let entry = entries
                        .into_iter()
                        .last()
                        .expect("guarded append returns the inserted entries");
                    return Ok(AccessRegistered {
                        entry,
                        auto_close_generated,
                    });
                }
                Err(StoreError::TailMoved(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AccessError::Storage(StoreError::TailMoved(employee.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn bogota() -> OrgTimeZone {
        OrgTimeZone::from_offset_minutes(-300).unwrap()
    }

    fn auto_close() -> NaiveTime {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap()
    }

    fn employee() -> Employee {
        Employee {
            id: 7,
            organization_id: 1,
            employee_code: "EMP-007".into(),
            display_name: "Marta Rojas".into(),
            face_token: "tok-7".into(),
            status: "active".into(),
            created_at: None,
        }
    }

    fn service(store: Arc<MemoryStore>, now: DateTime<Utc>) -> AttendanceService {
        AttendanceService::new(store, Arc::new(FixedClock(now)), bogota(), auto_close())
    }

    /// 09:00 local (UTC-5) on the given day.
    fn local_9am(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 14, 0, 0).unwrap()
    }

    async fn seed(store: &MemoryStore, employee: &Employee, action: ActionKind, at: DateTime<Utc>) {
        let tail = store.last_entry(employee.id).await.unwrap().map(|e| e.id);
        store
            .append_entries(
                employee.id,
                tail,
                vec![NewAccessLog {
                    organization_id: employee.organization_id,
                    employee_id: employee.id,
                    timestamp: at,
                    action,
                    auto_generated: false,
                }],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn first_check_in_creates_entry() {
        let store = Arc::new(MemoryStore::new());
        let now = local_9am(2024, 1, 1);
        let svc = service(store.clone(), now);

        let result = svc
            .register_access(&employee(), ActionKind::CheckIn)
            .await
            .unwrap();

        assert!(!result.auto_close_generated);
        assert_eq!(result.entry.action, ActionKind::CheckIn);
        assert_eq!(result.entry.timestamp, now);
        assert!(!result.entry.auto_generated);
        assert_eq!(store.all_entries().len(), 1);
    }

    #[tokio::test]
    async fn same_day_duplicate_check_in_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let emp = employee();
        seed(&store, &emp, ActionKind::CheckIn, local_9am(2024, 1, 1)).await;

        // Same local day, two hours later.
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 16, 0, 0).unwrap();
        let svc = service(store.clone(), now);

        let err = svc
            .register_access(&emp, ActionKind::CheckIn)
            .await
            .unwrap_err();

        match err {
            AccessError::DuplicateAction { action, last_at } => {
                assert_eq!(action, ActionKind::CheckIn);
                assert_eq!(last_at.to_utc(), local_9am(2024, 1, 1));
            }
            other => panic!("expected DuplicateAction, got {:?}", other),
        }
        assert_eq!(store.all_entries().len(), 1, "no ledger mutation on rejection");
    }

    #[tokio::test]
    async fn duplicate_check_out_is_rejected_with_last_timestamp() {
        let store = Arc::new(MemoryStore::new());
        let emp = employee();
        seed(&store, &emp, ActionKind::CheckIn, local_9am(2024, 1, 2)).await;
        // Check-out at 17:00 local.
        let out_at = Utc.with_ymd_and_hms(2024, 1, 2, 22, 0, 0).unwrap();
        seed(&store, &emp, ActionKind::CheckOut, out_at).await;

        let now = Utc.with_ymd_and_hms(2024, 1, 2, 22, 30, 0).unwrap();
        let svc = service(store.clone(), now);

        let err = svc
            .register_access(&emp, ActionKind::CheckOut)
            .await
            .unwrap_err();

        match err {
            AccessError::DuplicateAction { action, last_at } => {
                assert_eq!(action, ActionKind::CheckOut);
                assert_eq!(last_at.to_utc(), out_at);
            }
            other => panic!("expected DuplicateAction, got {:?}", other),
        }
        assert_eq!(store.all_entries().len(), 2);
    }

    #[tokio::test]
    async fn cross_day_unclosed_check_in_is_auto_closed() {
        let store = Arc::new(MemoryStore::new());
        let emp = employee();
        seed(&store, &emp, ActionKind::CheckIn, local_9am(2024, 1, 1)).await;

        let now = local_9am(2024, 1, 2);
        let svc = service(store.clone(), now);

        let result = svc
            .register_access(&emp, ActionKind::CheckIn)
            .await
            .unwrap();

        assert!(result.auto_close_generated);
        assert_eq!(result.entry.action, ActionKind::CheckIn);
        assert_eq!(result.entry.timestamp, now);

        let entries = store.all_entries();
        assert_eq!(entries.len(), 3);

        let synthesized = &entries[1];
        assert_eq!(synthesized.action, ActionKind::CheckOut);
        assert!(synthesized.auto_generated);
        // 23:59:59 local on Jan 1 is 04:59:59Z on Jan 2.
        assert_eq!(
            synthesized.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 4, 59, 59).unwrap()
        );
    }

    #[tokio::test]
    async fn only_the_stale_day_is_auto_closed_after_a_multi_day_gap() {
        let store = Arc::new(MemoryStore::new());
        let emp = employee();
        seed(&store, &emp, ActionKind::CheckIn, local_9am(2024, 1, 1)).await;

        // Next request arrives three days later.
        let svc = service(store.clone(), local_9am(2024, 1, 4));
        let result = svc
            .register_access(&emp, ActionKind::CheckIn)
            .await
            .unwrap();

        assert!(result.auto_close_generated);
        let entries = store.all_entries();
        assert_eq!(entries.len(), 3);
        // The synthesized check-out closes the stale day itself, not the
        // day before the new check-in.
        assert_eq!(
            entries[1].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 4, 59, 59).unwrap()
        );
    }

    #[tokio::test]
    async fn check_out_after_yesterdays_check_in_is_not_reconciled() {
        let store = Arc::new(MemoryStore::new());
        let emp = employee();
        seed(&store, &emp, ActionKind::CheckIn, local_9am(2024, 1, 1)).await;

        // An overnight shift checking out the next morning is a legitimate
        // alternation; no synthesis happens.
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 11, 0, 0).unwrap();
        let svc = service(store.clone(), now);

        let result = svc
            .register_access(&emp, ActionKind::CheckOut)
            .await
            .unwrap();

        assert!(!result.auto_close_generated);
        assert_eq!(store.all_entries().len(), 2);
        assert!(!result.entry.auto_generated);
    }

    /// Delegating store whose first `last_entry` answer is stale (`None`),
    /// simulating a concurrent request committing between read and write.
    struct StaleTailStore {
        inner: Arc<MemoryStore>,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl LedgerStore for StaleTailStore {
        async fn last_entry(
            &self,
            employee_id: u64,
        ) -> Result<Option<AccessLogEntry>, StoreError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(None);
            }
            self.inner.last_entry(employee_id).await
        }

        async fn append_entries(
            &self,
            employee_id: u64,
            expected_tail: Option<u64>,
            entries: Vec<NewAccessLog>,
        ) -> Result<Vec<AccessLogEntry>, StoreError> {
            self.inner
                .append_entries(employee_id, expected_tail, entries)
                .await
        }

        async fn entries_in_range(
            &self,
            organization_id: u64,
            employee_id: u64,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<AccessLogEntry>, StoreError> {
            self.inner
                .entries_in_range(organization_id, employee_id, from, to)
                .await
        }

        async fn entry_by_id(
            &self,
            access_log_id: u64,
        ) -> Result<Option<AccessLogEntry>, StoreError> {
            self.inner.entry_by_id(access_log_id).await
        }
    }

    #[tokio::test]
    async fn racing_request_is_re_decided_against_the_new_tail() {
        let inner = Arc::new(MemoryStore::new());
        let emp = employee();
        // A concurrent check-in already landed.
        seed(&inner, &emp, ActionKind::CheckIn, local_9am(2024, 1, 1)).await;

        let store = Arc::new(StaleTailStore {
            inner: inner.clone(),
            reads: AtomicUsize::new(0),
        });

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 1).unwrap();
        let svc = AttendanceService::new(store, Arc::new(FixedClock(now)), bogota(), auto_close());

        // First attempt sees a stale empty ledger, the guarded append
        // refuses it, and the retry correctly rejects the duplicate.
        let err = svc
            .register_access(&emp, ActionKind::CheckIn)
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::DuplicateAction { .. }));
        assert_eq!(inner.all_entries().len(), 1, "exactly one accepted action");
    }
}
