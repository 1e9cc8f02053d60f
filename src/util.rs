/*!
Miscellaneous utilities for `closecast`: trading calendar arithmetic and durations
*/

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use num::{Float, NumCast};

/// Whether a date falls on a weekday. Holidays are not considered.
#[inline]
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The first weekday strictly after `date`
pub fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while !is_weekday(next) {
        next = next + Duration::days(1);
    }
    next
}

/// The `n` weekdays following `date`, in increasing order
pub fn weekdays_after(date: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut curr = date;
    for _ in 0..n {
        curr = next_weekday(curr);
        dates.push(curr);
    }
    dates
}

/// Convert a `chrono::Duration` to a floating point containing the number of seconds
pub fn to_s<F: Float>(dur: Duration) -> F {
    let ms: F = NumCast::from(dur.num_milliseconds()).unwrap_or_else(F::infinity);
    let ms_in_sec: F = NumCast::from(1000).unwrap_or_else(F::one);
    ms / ms_in_sec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_s() {
        assert_eq!(to_s::<f64>(Duration::minutes(1)), 60.0);
        assert_eq!(to_s::<f32>(Duration::days(1)), 60.0 * 60.0 * 24.0);
    }

    #[test]
    fn weekends_are_skipped() {
        // 2024-03-08 is a Friday
        let friday = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        assert_eq!(
            next_weekday(friday),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
        let saturday = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            next_weekday(saturday),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
    }

    #[test]
    fn weekdays_after_are_distinct_and_increasing() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let dates = weekdays_after(start, 12);
        assert_eq!(dates.len(), 12);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert!(dates.iter().all(|d| is_weekday(*d)));
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert!(weekdays_after(start, 0).is_empty());
    }
}
