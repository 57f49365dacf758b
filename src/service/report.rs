use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::model::access_log::{AccessLogEntry, ActionKind};
use crate::utils::time::OrgTimeZone;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayWorked {
    pub date: NaiveDate,
    pub seconds: i64,
}

/// Result of the worked-hours computation over one employee's entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkedHours {
    pub total_seconds: i64,
    /// Chronologically sorted, keyed by the check-in's local date.
    pub per_day: Vec<DayWorked>,
    pub pair_count: usize,
    pub incomplete_count: usize,
}

/// Pair check-ins with the immediately following check-out and sum the
/// durations. Pure read-side computation: the input is never mutated and
/// the same entries always produce the same report.
///
/// Scanning left to right in timestamp order, a check-in immediately
/// followed by a check-out consumes both; anything else (a check-in
/// followed by another check-in, or an unconsumed check-out) counts as one
/// incomplete unit.
pub fn compute_worked_hours(entries: &[AccessLogEntry], tz: &OrgTimeZone) -> WorkedHours {
    let mut sorted: Vec<&AccessLogEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| (e.timestamp, e.id));

    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut total_seconds = 0i64;
    let mut pair_count = 0usize;
    let mut incomplete_count = 0usize;

    let mut i = 0;
    while i < sorted.len() {
        let entry = sorted[i];

        if entry.action == ActionKind::CheckIn {
            if let Some(next) = sorted.get(i + 1) {
                if next.action == ActionKind::CheckOut {
                    let seconds = (next.timestamp - entry.timestamp).num_seconds();
                    *per_day.entry(tz.local_date(entry.timestamp)).or_insert(0) += seconds;
                    total_seconds += seconds;
                    pair_count += 1;
                    i += 2;
                    continue;
                }
            }
        }

        incomplete_count += 1;
        i += 1;
    }

    WorkedHours {
        total_seconds,
        per_day: per_day
            .into_iter()
            .map(|(date, seconds)| DayWorked { date, seconds })
            .collect(),
        pair_count,
        incomplete_count,
    }
}

/// `8h00m`-style rendering used in report responses.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}h{:02}m", seconds / 3600, (seconds % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn bogota() -> OrgTimeZone {
        OrgTimeZone::from_offset_minutes(-300).unwrap()
    }

    /// Local wall-clock time (UTC-5) on the given day.
    fn local(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h + 5, m, 0).unwrap()
    }

    fn entry(id: u64, action: ActionKind, at: DateTime<Utc>) -> AccessLogEntry {
        AccessLogEntry {
            id,
            organization_id: 1,
            employee_id: 7,
            timestamp: at,
            action,
            auto_generated: false,
            edited_by_admin: false,
            edited_at: None,
            edited_by: None,
        }
    }

    #[test]
    fn pairs_full_day_into_buckets() {
        let entries = vec![
            entry(1, ActionKind::CheckIn, local(2, 8, 0)),
            entry(2, ActionKind::CheckOut, local(2, 12, 0)),
            entry(3, ActionKind::CheckIn, local(2, 13, 0)),
            entry(4, ActionKind::CheckOut, local(2, 17, 0)),
        ];

        let report = compute_worked_hours(&entries, &bogota());

        assert_eq!(report.total_seconds, 8 * 3600);
        assert_eq!(report.pair_count, 2);
        assert_eq!(report.incomplete_count, 0);
        assert_eq!(report.per_day.len(), 1);
        assert_eq!(report.per_day[0].seconds, 8 * 3600);
        assert_eq!(
            report.per_day[0].date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn unpaired_check_in_counts_as_incomplete() {
        // The 08:00 check-in is followed by another check-in, so it cannot
        // pair; the 09:00 one pairs with the 17:00 check-out.
        let entries = vec![
            entry(1, ActionKind::CheckIn, local(2, 8, 0)),
            entry(2, ActionKind::CheckIn, local(2, 9, 0)),
            entry(3, ActionKind::CheckOut, local(2, 17, 0)),
        ];

        let report = compute_worked_hours(&entries, &bogota());

        assert_eq!(report.pair_count, 1);
        assert_eq!(report.incomplete_count, 1);
        assert_eq!(report.total_seconds, 8 * 3600);
    }

    #[test]
    fn dangling_check_out_counts_as_incomplete() {
        let entries = vec![
            entry(1, ActionKind::CheckOut, local(2, 8, 0)),
            entry(2, ActionKind::CheckIn, local(2, 9, 0)),
            entry(3, ActionKind::CheckOut, local(2, 17, 0)),
        ];

        let report = compute_worked_hours(&entries, &bogota());

        assert_eq!(report.pair_count, 1);
        assert_eq!(report.incomplete_count, 1);
        assert_eq!(report.total_seconds, 8 * 3600);
    }

    #[test]
    fn empty_input_yields_zero_report() {
        let report = compute_worked_hours(&[], &bogota());

        assert_eq!(report.total_seconds, 0);
        assert!(report.per_day.is_empty());
        assert_eq!(report.pair_count, 0);
        assert_eq!(report.incomplete_count, 0);
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let entries = vec![
            entry(1, ActionKind::CheckIn, local(2, 8, 0)),
            entry(2, ActionKind::CheckOut, local(2, 12, 0)),
            entry(3, ActionKind::CheckIn, local(3, 13, 0)),
            entry(4, ActionKind::CheckOut, local(3, 17, 0)),
        ];

        let mut shuffled = entries.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);

        let a = compute_worked_hours(&entries, &bogota());
        let b = compute_worked_hours(&shuffled, &bogota());
        let c = compute_worked_hours(&entries, &bogota());

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.per_day.len(), 2);
    }

    #[test]
    fn overnight_pair_is_bucketed_on_check_in_date() {
        // 22:00 local Jan 2 to 02:00 local Jan 3.
        let entries = vec![
            entry(1, ActionKind::CheckIn, Utc.with_ymd_and_hms(2024, 1, 3, 3, 0, 0).unwrap()),
            entry(2, ActionKind::CheckOut, Utc.with_ymd_and_hms(2024, 1, 3, 7, 0, 0).unwrap()),
        ];

        let report = compute_worked_hours(&entries, &bogota());

        assert_eq!(report.per_day.len(), 1);
        assert_eq!(
            report.per_day[0].date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(report.total_seconds, 4 * 3600);
    }

    #[test]
    fn format_duration_renders_hours_and_minutes() {
        assert_eq!(format_duration(8 * 3600), "8h00m");
        assert_eq!(format_duration(4 * 3600 + 30 * 60), "4h30m");
        assert_eq!(format_duration(59), "0h00m");
        assert_eq!(format_duration(0), "0h00m");
    }
}
