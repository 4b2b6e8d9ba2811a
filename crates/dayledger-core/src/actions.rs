//! User-facing write paths.
//!
//! Each action mutates the evidence for a day, records a daily win when the new
//! evidence satisfies the user's config, and finishes with [`recompute_day`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::daily_win::{
    evidence_satisfies, get_daily_win_config, is_daily_win_satisfied, upsert_daily_win,
    DailyWin, DailyWinConfig, SatisfiedBy,
};
use crate::debt::{ensure_debt_for_missed_day, resolve_debt, ExecutionDebt, ResolutionType};
use crate::error::{CoreError, Result, ValidationError};
use crate::output::{validate_output, GoalArtifact, OutputType};
use crate::progress::{recompute_day, DayStatus};
use crate::quiet::quiet_week_for;
use crate::schedule::PlanTask;
use crate::storage::{Config, LedgerDb};
use crate::time::{add_days, day_key, DayKey};

/// How a day ended up, combining completion and the daily win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOutcome {
    /// Every requirement met
    Complete,
    /// Not complete, but the daily win was achieved
    Salvaged,
    /// Declared failure day
    Failure,
    Incomplete,
}

impl DayOutcome {
    pub fn classify(status: &DayStatus, daily_win: bool) -> Self {
        if status.is_complete {
            DayOutcome::Complete
        } else if status.is_failure_day {
            DayOutcome::Failure
        } else if daily_win {
            DayOutcome::Salvaged
        } else {
            DayOutcome::Incomplete
        }
    }
}

/// Status of one day with its daily-win evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: DayKey,
    pub status: DayStatus,
    pub daily_win: bool,
    pub outcome: DayOutcome,
}

/// Everything the "today" screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayView {
    pub summary: DaySummary,
    /// Unresolved debts, oldest first
    pub debts: Vec<ExecutionDebt>,
    pub daily_win_config: DailyWinConfig,
    pub daily_win_record: Option<DailyWin>,
    pub quiet_week: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockToggle {
    /// Whether the block is now completed for the day
    pub completed: bool,
    pub status: DayStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskToggle {
    pub task: PlanTask,
    pub status: DayStatus,
}

/// Record a win for `evidence` if the user's config accepts it.
fn record_win_if_satisfied(
    db: &LedgerDb,
    config: &Config,
    user_id: &str,
    day: DayKey,
    evidence: SatisfiedBy,
    now: NaiveDateTime,
) -> Result<()> {
    let win_config = get_daily_win_config(db, user_id, &config.daily_win)?;
    if evidence_satisfies(&win_config, &evidence) {
        upsert_daily_win(db, user_id, day, evidence, now)?;
    }
    Ok(())
}

/// Recompute `day` and evaluate its daily win.
pub fn summarize_day(
    db: &LedgerDb,
    config: &Config,
    user_id: &str,
    day: DayKey,
    now: NaiveDateTime,
) -> Result<DaySummary> {
    db.with_transaction(|db| {
        let status = recompute_day(db, user_id, day, now)?;
        let win_config = get_daily_win_config(db, user_id, &config.daily_win)?;
        let daily_win = is_daily_win_satisfied(db, user_id, day, &win_config)?;
        Ok(DaySummary {
            day,
            status,
            daily_win,
            outcome: DayOutcome::classify(&status, daily_win),
        })
    })
}

/// Complete a block for `day`, or un-complete it if it already was.
pub fn toggle_block(
    db: &LedgerDb,
    config: &Config,
    user_id: &str,
    block_id: &str,
    day: DayKey,
    now: NaiveDateTime,
) -> Result<BlockToggle> {
    db.with_transaction(|db| {
        if db.block(user_id, block_id)?.is_none() {
            return Err(CoreError::not_found("ScheduleBlock", block_id));
        }
        let completed = if db.delete_block_completion(user_id, block_id, day)? {
            false
        } else {
            db.insert_block_completion(user_id, block_id, day, now)?;
            record_win_if_satisfied(
                db,
                config,
                user_id,
                day,
                SatisfiedBy::Block(block_id.to_string()),
                now,
            )?;
            true
        };
        debug!(user = user_id, block = block_id, %day, completed, "block toggled");

        let status = recompute_day(db, user_id, day, now)?;
        Ok(BlockToggle { completed, status })
    })
}

/// Flip a task's completion and recompute the task's day.
pub fn toggle_task(db: &LedgerDb, user_id: &str, task_id: &str, now: NaiveDateTime) -> Result<TaskToggle> {
    db.with_transaction(|db| {
        let task = db
            .task(user_id, task_id)?
            .ok_or_else(|| CoreError::not_found("Task", task_id))?;
        let completed_at = if task.is_completed() { None } else { Some(now) };
        db.set_task_completed_at(user_id, task_id, completed_at)?;

        let status = recompute_day(db, user_id, task.day, now)?;
        Ok(TaskToggle {
            task: PlanTask {
                completed_at,
                ..task
            },
            status,
        })
    })
}

/// Validate and attach the day's output evidence.
pub fn save_output(
    db: &LedgerDb,
    config: &Config,
    user_id: &str,
    day: DayKey,
    output_type: OutputType,
    content: &str,
    now: NaiveDateTime,
) -> Result<DayStatus> {
    let content = validate_output(output_type, content)?;
    db.with_transaction(|db| {
        db.set_output(user_id, day, output_type, &content)?;
        record_win_if_satisfied(db, config, user_id, day, SatisfiedBy::Output, now)?;
        recompute_day(db, user_id, day, now)
    })
}

/// Record an artifact against the user's active goal.
pub fn save_artifact(
    db: &LedgerDb,
    config: &Config,
    user_id: &str,
    day: DayKey,
    kind: OutputType,
    content: &str,
    now: NaiveDateTime,
) -> Result<GoalArtifact> {
    let content = validate_output(kind, content)?;
    db.with_transaction(|db| {
        let goal_id = db.active_goal(user_id)?.ok_or(ValidationError::EmptyField("active_goal"))?;
        let artifact = db.insert_artifact(user_id, &goal_id, day, kind, &content, now)?;
        record_win_if_satisfied(db, config, user_id, day, SatisfiedBy::Output, now)?;
        recompute_day(db, user_id, day, now)?;
        Ok(artifact)
    })
}

/// Remove the day's output evidence.
///
/// This is the one path that clears a day's `completed_at`. A recorded daily
/// win is left in place.
pub fn undo_output(db: &LedgerDb, user_id: &str, day: DayKey, now: NaiveDateTime) -> Result<DayStatus> {
    db.with_transaction(|db| {
        if !db.clear_output(user_id, day)? {
            return Err(CoreError::not_found("DailyOutput", day.to_string()));
        }
        recompute_day(db, user_id, day, now)
    })
}

/// Open yesterday's debt if it is owed, then evaluate today.
pub fn view_today(db: &LedgerDb, config: &Config, user_id: &str, now: NaiveDateTime) -> Result<TodayView> {
    let today = day_key(now);
    db.with_transaction(|db| {
        ensure_debt_for_missed_day(db, user_id, add_days(today, -1)?, now)?;
        let summary = summarize_day(db, config, user_id, today, now)?;
        Ok(TodayView {
            summary,
            debts: db.unresolved_debts(user_id)?,
            daily_win_config: get_daily_win_config(db, user_id, &config.daily_win)?,
            daily_win_record: db.daily_win(user_id, today)?,
            quiet_week: quiet_week_for(db, user_id, today)?.is_some(),
        })
    })
}

/// Resolve a debt and recompute today so the lifted gate shows immediately.
pub fn resolve_debt_and_refresh(
    db: &LedgerDb,
    user_id: &str,
    debt_id: &str,
    resolution_type: ResolutionType,
    note: &str,
    now: NaiveDateTime,
) -> Result<(ExecutionDebt, DayStatus)> {
    db.with_transaction(|db| {
        let debt = resolve_debt(db, user_id, debt_id, resolution_type, note, now)?;
        let status = recompute_day(db, user_id, day_key(now), now)?;
        Ok((debt, status))
    })
}
