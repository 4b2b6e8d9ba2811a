//! Streaks and completion rate over the set of completed days.
//!
//! A day counts as completed when its `completed_at` marker is set, so a day
//! that was complete once keeps counting even if later edits undo it.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::time::DayKey;

/// Current and best run of consecutive completed days
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakMetrics {
    /// Run ending today (0 when today is not completed)
    pub current: u32,
    /// Longest run anywhere in history
    pub longest: u32,
}

/// Completion rate over a trailing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRate {
    /// Window length in days, today included
    pub window_days: u32,
    /// Completed days inside the window
    pub completed_days: u32,
    /// Rounded percentage (0-100)
    pub rate: u32,
}

/// Count back from `today` until the first day that is not completed.
pub fn calculate_streak(completed: &BTreeSet<DayKey>, today: DayKey) -> u32 {
    let mut streak = 0;
    let mut cursor = today;
    while completed.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

pub fn longest_streak(completed: &BTreeSet<DayKey>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<DayKey> = None;
    for &day in completed {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

pub fn streak_metrics(completed: &BTreeSet<DayKey>, today: DayKey) -> StreakMetrics {
    StreakMetrics {
        current: calculate_streak(completed, today),
        longest: longest_streak(completed),
    }
}

/// Share of the trailing `window_days` days (today included) that were completed.
///
/// A window reaching past the start of the calendar is clipped there; the
/// rate is still taken over the full window length.
pub fn completion_rate(completed: &BTreeSet<DayKey>, today: DayKey, window_days: u32) -> CompletionRate {
    if window_days == 0 {
        return CompletionRate {
            window_days,
            completed_days: 0,
            rate: 0,
        };
    }
    let start = today
        .checked_sub_days(Days::new(u64::from(window_days - 1)))
        .unwrap_or(NaiveDate::MIN);
    let completed_days = completed.range(start..=today).count() as u32;
    CompletionRate {
        window_days,
        completed_days,
        rate: percent(completed_days, window_days),
    }
}

/// `round(100 * part / whole)`; 0 for an empty whole.
pub(crate) fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) * 100.0 / f64::from(whole)).round() as u32
}
