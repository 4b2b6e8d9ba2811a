//! Calendar arithmetic shared by every component.
//!
//! All comparisons happen on day keys (`NaiveDate`) in the user's local
//! calendar. "Now" is always passed in as a local `NaiveDateTime`; nothing in
//! the engine reads the system clock.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::ValidationError;

/// A calendar day in local time.
pub type DayKey = NaiveDate;

/// Minutes in a day; block ranges live in `0..=MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

const DAY_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Truncate a local timestamp to its day key.
pub fn day_key(now: NaiveDateTime) -> DayKey {
    now.date()
}

/// Offset a day by `days` (negative goes backwards).
///
/// Fails when the result leaves chrono's calendar.
pub fn add_days(day: DayKey, days: i64) -> Result<DayKey, ValidationError> {
    let out_of_range = || ValidationError::DateOutOfRange { day, days };
    let delta = Duration::try_days(days).ok_or_else(out_of_range)?;
    day.checked_add_signed(delta).ok_or_else(out_of_range)
}

/// Whole days from `from` to `to`.
pub fn days_between(from: DayKey, to: DayKey) -> i64 {
    (to - from).num_days()
}

/// Only days strictly before `today` count as past.
pub fn is_past_day(day: DayKey, today: DayKey) -> bool {
    day < today
}

/// The Sunday on or before `day`. Saturates at the first representable day.
pub fn week_start(day: DayKey) -> DayKey {
    let back = Days::new(u64::from(day.weekday().num_days_from_sunday()));
    day.checked_sub_days(back).unwrap_or(NaiveDate::MIN)
}

/// Minute of the day for a local timestamp.
pub fn minute_of_day(now: NaiveDateTime) -> u32 {
    now.hour() * 60 + now.minute()
}

pub fn minutes_to_time_string(value: u32) -> String {
    format!("{:02}:{:02}", value / 60, value % 60)
}

/// Parse `HH:MM` into minutes after midnight. `24:00` is accepted as the end of day.
pub fn time_string_to_minutes(value: &str) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::InvalidTime(value.to_string());
    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 || hours > 24 || (hours == 24 && minutes > 0) {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Half-open minute ranges `[start, end)` overlap.
pub fn is_overlapping(a: (u32, u32), b: (u32, u32)) -> bool {
    a.0 < b.1 && a.1 > b.0
}

pub fn parse_day(value: &str) -> Result<DayKey, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Parse a local `YYYY-MM-DDTHH:MM:SS` timestamp.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Iterate up to `count` consecutive days starting at `start`, stopping at
/// the end of the calendar.
pub fn day_range(start: DayKey, count: u32) -> impl Iterator<Item = DayKey> {
    start.iter_days().take(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> DayKey {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn day_key_truncates_time() {
        let now = d(2026, 3, 4).and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(day_key(now), d(2026, 3, 4));
    }

    #[test]
    fn add_days_crosses_month_boundary() {
        assert_eq!(add_days(d(2026, 1, 31), 1).unwrap(), d(2026, 2, 1));
        assert_eq!(add_days(d(2026, 3, 1), -1).unwrap(), d(2026, 2, 28));
    }

    #[test]
    fn add_days_rejects_offsets_past_the_calendar() {
        let day = d(2026, 3, 4);
        for days in [i64::MAX, i64::MIN, i64::from(u32::MAX), -i64::from(u32::MAX)] {
            assert_eq!(
                add_days(day, days),
                Err(ValidationError::DateOutOfRange { day, days })
            );
        }
        assert!(add_days(NaiveDate::MAX, 1).is_err());
        assert!(add_days(NaiveDate::MIN, -1).is_err());
    }

    #[test]
    fn week_start_and_day_range_stay_in_calendar() {
        assert_eq!(week_start(NaiveDate::MIN), NaiveDate::MIN);
        let tail: Vec<_> = day_range(NaiveDate::MAX.pred_opt().unwrap(), u32::MAX).collect();
        assert_eq!(tail.len(), 2);
        assert_eq!(day_range(d(2026, 3, 1), 3).last(), Some(d(2026, 3, 3)));
    }

    #[test]
    fn week_start_is_sunday() {
        // 2026-03-04 is a Wednesday
        assert_eq!(week_start(d(2026, 3, 4)), d(2026, 3, 1));
        assert_eq!(week_start(d(2026, 3, 1)), d(2026, 3, 1));
        assert_eq!(week_start(d(2026, 3, 7)), d(2026, 3, 1));
        assert_eq!(week_start(d(2026, 3, 8)), d(2026, 3, 8));
    }

    #[test]
    fn past_day_excludes_today() {
        let today = d(2026, 3, 4);
        assert!(is_past_day(d(2026, 3, 3), today));
        assert!(!is_past_day(today, today));
        assert!(!is_past_day(d(2026, 3, 5), today));
    }

    #[test]
    fn time_strings_roundtrip() {
        assert_eq!(minutes_to_time_string(0), "00:00");
        assert_eq!(minutes_to_time_string(545), "09:05");
        assert_eq!(time_string_to_minutes("09:05").unwrap(), 545);
        assert_eq!(time_string_to_minutes("24:00").unwrap(), MINUTES_PER_DAY);
    }

    #[test]
    fn malformed_times_are_rejected() {
        for bad in ["", "9", "ab:cd", "12:60", "25:00", "24:01"] {
            assert!(time_string_to_minutes(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn overlap_is_half_open() {
        assert!(is_overlapping((60, 120), (90, 150)));
        assert!(!is_overlapping((60, 120), (120, 180)));
    }

    #[test]
    fn parse_day_rejects_garbage() {
        assert_eq!(parse_day("2026-03-04").unwrap(), d(2026, 3, 4));
        assert!(matches!(
            parse_day("03/04/2026"),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn parse_timestamp_is_local_and_strict() {
        assert_eq!(
            parse_timestamp("2026-03-04T21:15:00").unwrap(),
            d(2026, 3, 4).and_hms_opt(21, 15, 0).unwrap()
        );
        assert!(parse_timestamp("2026-03-04").is_err());
    }

    #[test]
    fn minute_of_day_counts_from_midnight() {
        let now = d(2026, 3, 4).and_hms_opt(9, 30, 12).unwrap();
        assert_eq!(minute_of_day(now), 570);
    }
}
