//! Trailing day windows in a fixed UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Timelike, Utc};

/// `days` consecutive local calendar days ending with the day containing
/// `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    first_day: NaiveDate,
    days: u32,
    offset: FixedOffset,
}

impl Window {
    /// `days` must be at least 1; callers validate the range.
    pub fn trailing(now: DateTime<Utc>, days: u32, offset: FixedOffset) -> Self {
        let days = days.max(1);
        let today = now.with_timezone(&offset).date_naive();
        Self {
            first_day: today - TimeDelta::days(i64::from(days - 1)),
            days,
            offset,
        }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day + TimeDelta::days(i64::from(self.days - 1))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Every day of the window, oldest first.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.first_day.iter_days().take(self.days as usize)
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn local_hour(&self, at: DateTime<Utc>) -> u32 {
        at.with_timezone(&self.offset).hour()
    }

    /// Index of the local day containing `at`, if it falls in the window.
    pub fn day_index(&self, at: DateTime<Utc>) -> Option<usize> {
        let index = (self.local_date(at) - self.first_day).num_days();
        (0..i64::from(self.days))
            .contains(&index)
            .then_some(index as usize)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.day_index(at).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn trailing_window_ends_today() {
        let window = Window::trailing(utc(2024, 3, 10, 15), 7, FixedOffset::east_opt(0).unwrap());
        assert_eq!(window.first_day(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(window.last_day(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(window.dates().count(), 7);

        assert_eq!(window.day_index(utc(2024, 3, 4, 0)), Some(0));
        assert_eq!(window.day_index(utc(2024, 3, 10, 23)), Some(6));
        assert_eq!(window.day_index(utc(2024, 3, 3, 23)), None);
        assert_eq!(window.day_index(utc(2024, 3, 11, 0)), None);
    }

    #[test]
    fn offset_moves_day_boundaries() {
        // 02:00 UTC on the 10th is still the 9th at UTC-5.
        let west = FixedOffset::west_opt(5 * 3600).unwrap();
        let window = Window::trailing(utc(2024, 3, 10, 2), 2, west);
        assert_eq!(window.last_day(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(window.local_hour(utc(2024, 3, 10, 2)), 21);
        assert_eq!(window.day_index(utc(2024, 3, 10, 2)), Some(1));
    }

    #[test]
    fn single_day_window() {
        let window = Window::trailing(utc(2024, 1, 1, 12), 1, FixedOffset::east_opt(0).unwrap());
        assert_eq!(window.first_day(), window.last_day());
        assert!(window.contains(utc(2024, 1, 1, 0)));
        assert!(!window.contains(utc(2023, 12, 31, 23)));
    }
}
