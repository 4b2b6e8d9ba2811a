//! How quickly the user bounces back after a failure day.

use std::collections::BTreeSet;
use std::ops::Bound::{Excluded, Unbounded};

use serde::{Deserialize, Serialize};

use super::streak::percent;
use crate::time::{days_between, DayKey};

/// Recovery after declared failure days
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryMetrics {
    /// Number of failure days considered
    pub failure_count: u32,
    /// Failures followed by a completed day within the threshold
    pub recovered_count: u32,
    /// `recovered_count` as a rounded percentage of `failure_count`
    pub recovery_rate: u32,
    /// Rounded mean days to the next completed day.
    ///
    /// Divides by every failure, including ones never followed by a completion.
    pub avg_recovery_time: u32,
}

/// Measure recovery for each failure day against the first completed day after it.
///
/// A failure counts as recovered when that completion is at most
/// `threshold_days` later.
pub fn recovery_metrics(
    failure_days: &[DayKey],
    completed: &BTreeSet<DayKey>,
    threshold_days: u32,
) -> RecoveryMetrics {
    let failure_count = failure_days.len() as u32;
    if failure_count == 0 {
        return RecoveryMetrics::default();
    }

    let mut recovered_count = 0;
    let mut total_days: i64 = 0;
    for &failure in failure_days {
        let next = completed.range((Excluded(failure), Unbounded)).next();
        if let Some(&completion) = next {
            let diff = days_between(failure, completion);
            if diff <= i64::from(threshold_days) {
                recovered_count += 1;
            }
            total_days += diff;
        }
    }

    RecoveryMetrics {
        failure_count,
        recovered_count,
        recovery_rate: percent(recovered_count, failure_count),
        avg_recovery_time: (total_days as f64 / f64::from(failure_count)).round() as u32,
    }
}
