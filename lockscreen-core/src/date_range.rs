//! The local calendar day a run renders.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Midnight-to-midnight window for one date in the configured timezone.
/// `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate, tz: Tz) -> Self {
        let start = resolve_local(tz, date.and_time(NaiveTime::MIN));
        let end = match date.succ_opt() {
            Some(next) => resolve_local(tz, next.and_time(NaiveTime::MIN)),
            None => start + Duration::days(1),
        };

        DayWindow { date, start, end }
    }

    pub fn contains(&self, instant: &DateTime<Tz>) -> bool {
        *instant >= self.start && *instant < self.end
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }

    pub fn tz(&self) -> Tz {
        self.start.timezone()
    }
}

/// Interpret a wall-clock time in `tz`.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times inside a
/// DST gap move forward by an hour, which lands on the first valid instant
/// for every zone in the tz database.
pub fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }

    tz.from_local_datetime(&(naive + Duration::hours(1)))
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::{America, Australia};

    #[test]
    fn test_window_is_local_midnight_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
        let window = DayWindow::for_date(date, Australia::Brisbane);

        // Brisbane is UTC+10 with no DST
        assert_eq!(
            window.start_utc(),
            Utc.with_ymd_and_hms(2025, 9, 25, 14, 0, 0).unwrap()
        );
        assert_eq!(window.end - window.start, Duration::hours(24));
    }

    #[test]
    fn test_contains_excludes_next_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
        let window = DayWindow::for_date(date, Australia::Brisbane);

        assert!(window.contains(&window.start));
        assert!(!window.contains(&window.end));
        assert!(!window.contains(&(window.start - Duration::seconds(1))));
        assert!(window.contains(&(window.end - Duration::seconds(1))));
    }

    #[test]
    fn test_dst_change_day_is_23_hours() {
        // US spring forward: 2025-03-09
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let window = DayWindow::for_date(date, America::New_York);
        assert_eq!(window.end - window.start, Duration::hours(23));
    }

    #[test]
    fn test_resolve_local_skips_dst_gap() {
        // 02:30 does not exist in New York on 2025-03-09
        let naive = NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let resolved = resolve_local(America::New_York, naive);
        assert_eq!(resolved.hour(), 3);
        assert_eq!(resolved.minute(), 30);
    }
}
