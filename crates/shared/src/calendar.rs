//! Calendar day normalization.
//!
//! Timestamps are stored in UTC but grouped into days in the user's local
//! offset, so the same instant can land on different days for different
//! calendars.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl Calendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Returns None if the offset is a day or more away from UTC
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn day_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    pub fn start_of(&self, day: NaiveDate) -> DateTime<Utc> {
        // A fixed offset has no gaps so midnight always maps to a single instant
        self.offset
            .from_local_datetime(&day.and_time(NaiveTime::MIN))
            .single()
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
    }

    pub fn start_of_day(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        self.start_of(self.day_of(ts))
    }

    /// Half open `[start, end)` range covering the day containing `ts`
    pub fn day_bounds(&self, ts: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start_of_day(ts);
        (start, start + Duration::days(1))
    }

    /// Whole calendar days from `from` to `to`, negative if `to` is earlier
    pub fn days_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        (self.day_of(to) - self.day_of(from)).num_days()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_start_of_day_utc() {
        let cal = Calendar::utc();
        assert_eq!(cal.start_of_day(ts("2024-03-05T20:15:00Z")), ts("2024-03-05T00:00:00Z"));
    }

    #[test]
    fn test_offset_moves_day_boundary() {
        // 23:30 UTC is already the next morning two hours east
        let cal = Calendar::from_offset_minutes(120).unwrap();
        let t = ts("2024-03-05T23:30:00Z");
        assert_eq!(cal.day_of(t), NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert_eq!(cal.start_of_day(t), ts("2024-03-05T22:00:00Z"));

        let (start, end) = cal.day_bounds(t);
        assert_eq!(end - start, Duration::days(1));
        assert!(start <= t && t < end);
    }

    #[test]
    fn test_days_between_counts_calendar_days_not_hours() {
        let cal = Calendar::utc();
        assert_eq!(cal.days_between(ts("2024-03-04T23:59:00Z"), ts("2024-03-05T00:01:00Z")), 1);
        assert_eq!(cal.days_between(ts("2024-03-05T00:01:00Z"), ts("2024-03-05T23:59:00Z")), 0);
    }

    #[test]
    fn test_rejects_out_of_range_offset() {
        assert!(Calendar::from_offset_minutes(24 * 60).is_none());
    }
}
