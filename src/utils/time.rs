use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Source of the server-trusted current instant. Injected into the services
/// so tests can pin time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed organization UTC offset used for all day-boundary decisions and
/// local display. Instants are stored in UTC everywhere; this is the single
/// place where wall-clock interpretation happens.
#[derive(Debug, Clone, Copy)]
pub struct OrgTimeZone {
    offset: FixedOffset,
}

impl OrgTimeZone {
    /// `minutes` east of UTC, e.g. -300 for UTC-5 (Bogota).
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes * 60).map(|offset| Self { offset })
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Calendar date of `instant` on the organization's wall clock.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date_naive()
    }

    /// Instant at which the organization wall clock shows `date` + `time`.
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .expect("fixed offsets have no DST gaps")
            .with_timezone(&Utc)
    }
}

/// Strict 24-hour `HH:MM` parse. Trailing seconds or garbage are rejected.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bogota() -> OrgTimeZone {
        OrgTimeZone::from_offset_minutes(-300).unwrap()
    }

    #[test]
    fn local_date_shifts_across_midnight() {
        let tz = bogota();
        // 04:59:59Z is still the previous day in UTC-5.
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 4, 59, 59).unwrap();
        assert_eq!(
            tz.local_date(instant),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );

        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap();
        assert_eq!(
            tz.local_date(instant),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn at_converts_local_wall_clock_to_utc() {
        let tz = bogota();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let time = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(
            tz.at(date, time),
            Utc.with_ymd_and_hms(2024, 1, 2, 4, 59, 59).unwrap()
        );
    }

    #[test]
    fn at_round_trips_with_local_date() {
        let tz = bogota();
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let instant = tz.at(date, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(tz.local_date(instant), date);
    }

    #[test]
    fn parse_hhmm_accepts_valid_times() {
        assert_eq!(parse_hhmm("08:45"), NaiveTime::from_hms_opt(8, 45, 0));
        assert_eq!(parse_hhmm("  23:59 "), NaiveTime::from_hms_opt(23, 59, 0));
        assert_eq!(parse_hhmm("00:00"), NaiveTime::from_hms_opt(0, 0, 0));
    }

    #[test]
    fn parse_hhmm_rejects_malformed_input() {
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("12:60"), None);
        assert_eq!(parse_hhmm("12:30:15"), None);
        assert_eq!(parse_hhmm("noon"), None);
        assert_eq!(parse_hhmm(""), None);
    }
}
