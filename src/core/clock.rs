//! Calendar-day arithmetic.
//!
//! Day counts follow a date/time decomposition of the interval: the difference
//! between the two calendar dates, minus one when the later timestamp's
//! time-of-day has not yet reached the earlier one's. This matches what a
//! date-time library reports as the "days" component of a difference, and is
//! deliberately not `(b - a) / 86400`.

use chrono::{DateTime, Utc};

/// Whole calendar days between `a` and `b`.
///
/// With `absolute` set the result is never negative. Otherwise it is negative
/// when `a` is more recent than `b`.
#[must_use]
pub fn signed_day_difference(a: DateTime<Utc>, b: DateTime<Utc>, absolute: bool) -> i64 {
    let (earlier, later, sign) = if a <= b { (a, b, 1) } else { (b, a, -1) };

    let mut days = (later.date_naive() - earlier.date_naive()).num_days();
    if later.time() < earlier.time() {
        days -= 1;
    }

    if absolute { days } else { sign * days }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_same_instant_is_zero() {
        let now = at(2024, 3, 10, 12, 0);
        assert_eq!(signed_day_difference(now, now, true), 0);
        assert_eq!(signed_day_difference(now, now, false), 0);
    }

    #[test]
    fn test_partial_day_does_not_count() {
        let a = at(2024, 3, 10, 18, 0);
        let b = at(2024, 3, 11, 9, 0);
        assert_eq!(signed_day_difference(a, b, true), 0);

        let c = at(2024, 3, 11, 18, 0);
        assert_eq!(signed_day_difference(a, c, true), 1);
    }

    #[test]
    fn test_across_month_and_leap_day() {
        let a = at(2024, 2, 28, 8, 30);
        let b = at(2024, 3, 1, 8, 30);
        assert_eq!(signed_day_difference(a, b, true), 2);
    }

    #[test]
    fn test_sign_follows_direction() {
        let older = at(2024, 1, 1, 0, 0);
        let newer = older + Duration::days(45) + Duration::hours(3);

        assert_eq!(signed_day_difference(older, newer, false), 45);
        assert_eq!(signed_day_difference(newer, older, false), -45);
        assert_eq!(
            signed_day_difference(newer, older, false).abs(),
            signed_day_difference(newer, older, true)
        );
    }

    #[test]
    fn test_matches_whole_days_elapsed() {
        let start = at(2023, 11, 5, 23, 59);
        for days in [1, 30, 89, 90, 91, 365] {
            let end = start + Duration::days(days);
            assert_eq!(signed_day_difference(start, end, true), days);
            assert_eq!(
                signed_day_difference(start, end - Duration::minutes(1), true),
                days - 1
            );
        }
    }
}
