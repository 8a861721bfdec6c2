//! Bucket arithmetic for snapshot types.
//!
//! Every stored `snapshot_date` is a bucket start:
//!
//! | Type        | Bucket start                          |
//! |-------------|---------------------------------------|
//! | `weekly`    | Monday of the ISO week                |
//! | `monthly`   | 1st of the month                      |
//! | `quarterly` | 1st of January, April, July, October  |
//! | `yearly`    | January 1st                           |

use chrono::{Datelike, Days, Months, NaiveDate};

use super::range::DateRange;
use crate::types::SnapshotType;

impl SnapshotType {
    /// Normalize any date to the start of the bucket containing it.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            SnapshotType::Weekly => {
                let offset = date.weekday().num_days_from_monday() as u64;
                date.checked_sub_days(Days::new(offset)).unwrap_or(date)
            }
            SnapshotType::Monthly => date.with_day(1).unwrap_or(date),
            SnapshotType::Quarterly => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
            SnapshotType::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Start of the bucket following the one containing `date`.
    ///
    /// Returns `None` past the end of the representable calendar.
    pub fn next_bucket(&self, date: NaiveDate) -> Option<NaiveDate> {
        let start = self.bucket_start(date);
        match self {
            SnapshotType::Weekly => start.checked_add_days(Days::new(7)),
            SnapshotType::Monthly => start.checked_add_months(Months::new(1)),
            SnapshotType::Quarterly => start.checked_add_months(Months::new(3)),
            SnapshotType::Yearly => start.checked_add_months(Months::new(12)),
        }
    }

    /// Start of the bucket preceding the one containing `date`.
    pub fn previous_bucket(&self, date: NaiveDate) -> Option<NaiveDate> {
        let start = self.bucket_start(date);
        match self {
            SnapshotType::Weekly => start.checked_sub_days(Days::new(7)),
            SnapshotType::Monthly => start.checked_sub_months(Months::new(1)),
            SnapshotType::Quarterly => start.checked_sub_months(Months::new(3)),
            SnapshotType::Yearly => start.checked_sub_months(Months::new(12)),
        }
    }

    /// The activity window that ends at `snapshot_date`: from the start of the
    /// previous bucket through `snapshot_date` itself (both days inclusive).
    pub fn bucket_window(&self, snapshot_date: NaiveDate) -> DateRange {
        DateRange {
            start: self.previous_bucket(snapshot_date).unwrap_or(snapshot_date),
            end: snapshot_date,
        }
    }

    /// All bucket starts whose bucket intersects `[start, end]`, ascending.
    pub fn bucket_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        if end < start {
            return dates;
        }

        let mut current = self.bucket_start(start);
        while current <= end {
            dates.push(current);
            match self.next_bucket(current) {
                Some(next) if next > current => current = next,
                _ => break,
            }
        }
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekly_starts_on_monday() {
        // 2024-01-04 is a Thursday
        assert_eq!(SnapshotType::Weekly.bucket_start(date(2024, 1, 4)), date(2024, 1, 1));
        // Sunday belongs to the week that started the previous Monday
        assert_eq!(SnapshotType::Weekly.bucket_start(date(2024, 1, 7)), date(2024, 1, 1));
        assert_eq!(SnapshotType::Weekly.bucket_start(date(2024, 1, 8)), date(2024, 1, 8));
        // ISO week crossing a year boundary
        assert_eq!(SnapshotType::Weekly.bucket_start(date(2025, 1, 1)), date(2024, 12, 30));
    }

    #[test]
    fn test_month_quarter_year_starts() {
        assert_eq!(SnapshotType::Monthly.bucket_start(date(2024, 2, 29)), date(2024, 2, 1));
        assert_eq!(SnapshotType::Quarterly.bucket_start(date(2024, 3, 31)), date(2024, 1, 1));
        assert_eq!(SnapshotType::Quarterly.bucket_start(date(2024, 5, 15)), date(2024, 4, 1));
        assert_eq!(SnapshotType::Quarterly.bucket_start(date(2024, 12, 1)), date(2024, 10, 1));
        assert_eq!(SnapshotType::Yearly.bucket_start(date(2024, 8, 9)), date(2024, 1, 1));
    }

    #[test]
    fn test_next_and_previous_bucket() {
        assert_eq!(SnapshotType::Monthly.next_bucket(date(2024, 12, 20)), Some(date(2025, 1, 1)));
        assert_eq!(SnapshotType::Monthly.previous_bucket(date(2024, 1, 20)), Some(date(2023, 12, 1)));
        assert_eq!(SnapshotType::Quarterly.next_bucket(date(2024, 11, 2)), Some(date(2025, 1, 1)));
        assert_eq!(SnapshotType::Weekly.previous_bucket(date(2024, 1, 3)), Some(date(2023, 12, 25)));
        assert_eq!(SnapshotType::Yearly.previous_bucket(date(2024, 6, 1)), Some(date(2023, 1, 1)));
    }

    #[test]
    fn test_bucket_window_ends_at_snapshot_date() {
        let window = SnapshotType::Monthly.bucket_window(date(2024, 3, 1));
        assert_eq!(window.start, date(2024, 2, 1));
        assert_eq!(window.end, date(2024, 3, 1));
    }

    #[test]
    fn test_bucket_dates() {
        let months = SnapshotType::Monthly.bucket_dates(date(2024, 1, 15), date(2024, 4, 1));
        assert_eq!(
            months,
            vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)]
        );

        let weeks = SnapshotType::Weekly.bucket_dates(date(2024, 1, 3), date(2024, 1, 14));
        assert_eq!(weeks, vec![date(2024, 1, 1), date(2024, 1, 8)]);

        assert!(SnapshotType::Yearly
            .bucket_dates(date(2024, 1, 1), date(2023, 1, 1))
            .is_empty());
    }
}
