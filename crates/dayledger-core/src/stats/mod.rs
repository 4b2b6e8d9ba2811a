//! Read-side analytics over a user's completion and failure history.
//!
//! The pure calculations take day sets so they can be reused and tested in
//! isolation; the `load_*` helpers read the history from one consistent
//! snapshot first.

mod allocation;
mod daily;
mod quality;
mod recovery;
mod streak;
mod weekly;

pub use allocation::{time_allocation, weekly_time_reality, TimeAllocation, WeeklyTimeReality};
pub use daily::{
    block_consistency, daily_completion_stats, BlockConsistency, CategoryConsistencyDay,
    DailyCompletionStat, DayCompletionStatus, DEFAULT_COMPLETION_STATS_DAYS,
    DEFAULT_CONSISTENCY_DAYS,
};
pub use quality::{
    classify_depth, output_quality_stats, OutputDepth, OutputQualityStats, OutputTimelineEntry,
    WeeklyDepth, DEFAULT_QUALITY_WEEKS,
};
pub use recovery::{recovery_metrics, RecoveryMetrics};
pub use streak::{
    calculate_streak, completion_rate, longest_streak, streak_metrics, CompletionRate,
    StreakMetrics,
};
pub use weekly::{weekly_summaries, WeeklySummary, SUMMARY_LIMIT};

use crate::error::Result;
use crate::storage::{AnalyticsConfig, LedgerDb, RulesConfig};
use crate::time::DayKey;

pub fn load_streak_metrics(db: &LedgerDb, user_id: &str, today: DayKey) -> Result<StreakMetrics> {
    let history = db.history_snapshot(user_id)?;
    Ok(streak_metrics(&history.completed_set(), today))
}

/// Completion rate with the window clamped to the configured bounds.
pub fn load_completion_rate(
    db: &LedgerDb,
    user_id: &str,
    today: DayKey,
    window_days: Option<u32>,
    analytics: &AnalyticsConfig,
) -> Result<CompletionRate> {
    let window = analytics.clamp_window(window_days.unwrap_or(analytics.completion_window_days));
    let history = db.history_snapshot(user_id)?;
    Ok(completion_rate(&history.completed_set(), today, window))
}

pub fn load_recovery_metrics(db: &LedgerDb, user_id: &str, rules: &RulesConfig) -> Result<RecoveryMetrics> {
    let history = db.history_snapshot(user_id)?;
    Ok(recovery_metrics(
        &history.failure_days,
        &history.completed_set(),
        rules.recovery_threshold_days,
    ))
}
