//! Engine-derived records: day completions, debts, failure days, daily wins,
//! quiet weeks, weekly reviews and insights, and block annotations.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use super::database::{parse_column, parse_optional_column, LedgerDb};
use crate::annotations::{BlockResistance, NextAction};
use crate::daily_win::{DailyWin, SatisfiedBy};
use crate::debt::{ExecutionDebt, ResolutionType};
use crate::error::Result;
use crate::failure::FailureDay;
use crate::insights::{Trend, WeeklyInsights};
use crate::output::OutputType;
use crate::progress::{DailyCompletion, DayStatus};
use crate::quiet::QuietWeek;
use crate::review::{ReviewAnswers, WeeklyReview};
use crate::time::DayKey;

const COMPLETION_COLUMNS: &str = "user_id, day, output_type, output_content,
    mandatory_blocks_done, mandatory_tasks_done, output_ready, completed_at";
const DEBT_COLUMNS: &str =
    "id, user_id, missed_day, reason, created_at, resolved_at, resolution_type, resolution_note";
const REVIEW_COLUMNS: &str =
    "user_id, week_start, q1, q2, q3, q4, stop_doing, resistance_block, created_at";

fn row_to_completion(row: &Row<'_>) -> rusqlite::Result<DailyCompletion> {
    Ok(DailyCompletion {
        user_id: row.get(0)?,
        day: row.get(1)?,
        output_type: parse_optional_column::<OutputType>(row, 2)?,
        output_content: row.get(3)?,
        mandatory_blocks_done: row.get(4)?,
        mandatory_tasks_done: row.get(5)?,
        output_ready: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

fn row_to_debt(row: &Row<'_>) -> rusqlite::Result<ExecutionDebt> {
    Ok(ExecutionDebt {
        id: row.get(0)?,
        user_id: row.get(1)?,
        missed_day: row.get(2)?,
        reason: row.get(3)?,
        created_at: row.get(4)?,
        resolved_at: row.get(5)?,
        resolution_type: parse_optional_column::<ResolutionType>(row, 6)?,
        resolution_note: row.get(7)?,
    })
}

fn row_to_failure(row: &Row<'_>) -> rusqlite::Result<FailureDay> {
    Ok(FailureDay {
        user_id: row.get(0)?,
        day: row.get(1)?,
        note: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_review(row: &Row<'_>) -> rusqlite::Result<WeeklyReview> {
    Ok(WeeklyReview {
        user_id: row.get(0)?,
        week_start: row.get(1)?,
        answers: ReviewAnswers {
            q1: row.get(2)?,
            q2: row.get(3)?,
            q3: row.get(4)?,
            q4: row.get(5)?,
            stop_doing: row.get(6)?,
            resistance_block: row.get(7)?,
        },
        created_at: row.get(8)?,
    })
}

fn row_to_next_action(row: &Row<'_>) -> rusqlite::Result<NextAction> {
    Ok(NextAction {
        user_id: row.get(0)?,
        block_id: row.get(1)?,
        day: row.get(2)?,
        action: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Decode a JSON TEXT column.
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn midnight(day: DayKey) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

impl LedgerDb {
    // === Daily completions ===

    pub fn daily_completion(&self, user_id: &str, day: DayKey) -> Result<Option<DailyCompletion>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {COMPLETION_COLUMNS} FROM daily_completions WHERE user_id = ?1 AND day = ?2"
                ),
                params![user_id, day],
                row_to_completion,
            )
            .optional()?)
    }

    /// Write the derived flags for a day, creating the row if needed.
    ///
    /// An already stored `completed_at` always survives.
    pub fn upsert_day_flags(
        &self,
        user_id: &str,
        day: DayKey,
        status: &DayStatus,
        completed_at: Option<NaiveDateTime>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO daily_completions
                (user_id, day, mandatory_blocks_done, mandatory_tasks_done, output_ready, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, day) DO UPDATE SET
                mandatory_blocks_done = excluded.mandatory_blocks_done,
                mandatory_tasks_done = excluded.mandatory_tasks_done,
                output_ready = excluded.output_ready,
                completed_at = COALESCE(daily_completions.completed_at, excluded.completed_at)",
            params![
                user_id,
                day,
                status.mandatory_blocks_done,
                status.mandatory_tasks_done,
                status.output_ready,
                completed_at,
            ],
        )?;
        Ok(())
    }

    /// Attach output evidence to a day. Content is stored as given.
    pub fn set_output(
        &self,
        user_id: &str,
        day: DayKey,
        output_type: OutputType,
        content: &str,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO daily_completions (user_id, day, output_type, output_content)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, day) DO UPDATE SET
                output_type = excluded.output_type,
                output_content = excluded.output_content",
            params![user_id, day, output_type.as_str(), content],
        )?;
        Ok(())
    }

    /// Remove output evidence and the first-completion marker.
    ///
    /// Returns false when the day had no output.
    pub fn clear_output(&self, user_id: &str, day: DayKey) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE daily_completions
             SET output_type = NULL, output_content = NULL, output_ready = 0, completed_at = NULL
             WHERE user_id = ?1 AND day = ?2 AND output_type IS NOT NULL",
            params![user_id, day],
        )?;
        Ok(changed == 1)
    }

    /// Days in `[start, end)` with `completed_at` set.
    pub fn count_completed_between(&self, user_id: &str, start: DayKey, end: DayKey) -> Result<u32> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM daily_completions
             WHERE user_id = ?1 AND day >= ?2 AND day < ?3 AND completed_at IS NOT NULL",
            params![user_id, start, end],
            |row| row.get(0),
        )?)
    }

    /// Stored day records in `[start, end)`, ascending.
    pub fn daily_completions_between(
        &self,
        user_id: &str,
        start: DayKey,
        end: DayKey,
    ) -> Result<Vec<DailyCompletion>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {COMPLETION_COLUMNS} FROM daily_completions
             WHERE user_id = ?1 AND day >= ?2 AND day < ?3 ORDER BY day ASC"
        ))?;
        let rows = stmt.query_map(params![user_id, start, end], row_to_completion)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // === Execution debts ===

    pub fn debt(&self, user_id: &str, debt_id: &str) -> Result<Option<ExecutionDebt>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {DEBT_COLUMNS} FROM execution_debts WHERE user_id = ?1 AND id = ?2"),
                params![user_id, debt_id],
                row_to_debt,
            )
            .optional()?)
    }

    pub fn debt_for_day(&self, user_id: &str, day: DayKey) -> Result<Option<ExecutionDebt>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {DEBT_COLUMNS} FROM execution_debts WHERE user_id = ?1 AND missed_day = ?2"
                ),
                params![user_id, day],
                row_to_debt,
            )
            .optional()?)
    }

    /// Insert unless the day already has a debt. Returns true when inserted.
    pub fn insert_debt_if_absent(&self, debt: &ExecutionDebt) -> Result<bool> {
        let changed = self.conn().execute(
            "INSERT INTO execution_debts (id, user_id, missed_day, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, missed_day) DO NOTHING",
            params![debt.id, debt.user_id, debt.missed_day, debt.reason, debt.created_at],
        )?;
        Ok(changed == 1)
    }

    /// Unresolved debts, oldest first.
    pub fn unresolved_debts(&self, user_id: &str) -> Result<Vec<ExecutionDebt>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DEBT_COLUMNS} FROM execution_debts
             WHERE user_id = ?1 AND resolved_at IS NULL
             ORDER BY created_at ASC, missed_day ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_debt)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn oldest_unresolved_debt(&self, user_id: &str) -> Result<Option<ExecutionDebt>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {DEBT_COLUMNS} FROM execution_debts
                     WHERE user_id = ?1 AND resolved_at IS NULL
                     ORDER BY created_at ASC, missed_day ASC LIMIT 1"
                ),
                params![user_id],
                row_to_debt,
            )
            .optional()?)
    }

    pub fn resolve_debt_row(
        &self,
        user_id: &str,
        debt_id: &str,
        resolution_type: ResolutionType,
        note: &str,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE execution_debts
             SET resolved_at = ?3, resolution_type = ?4, resolution_note = ?5
             WHERE user_id = ?1 AND id = ?2",
            params![user_id, debt_id, now, resolution_type.as_str(), note],
        )?;
        Ok(changed == 1)
    }

    /// Delete the debt for a day. Returns true when one existed.
    pub fn delete_debt_for_day(&self, user_id: &str, day: DayKey) -> Result<bool> {
        let changed = self.conn().execute(
            "DELETE FROM execution_debts WHERE user_id = ?1 AND missed_day = ?2",
            params![user_id, day],
        )?;
        Ok(changed > 0)
    }

    /// Resolved debts created in `[start, end)`.
    pub fn count_resolved_debts_created_between(
        &self,
        user_id: &str,
        start: DayKey,
        end: DayKey,
    ) -> Result<u32> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM execution_debts
             WHERE user_id = ?1 AND resolved_at IS NOT NULL AND created_at >= ?2 AND created_at < ?3",
            params![user_id, midnight(start), midnight(end)],
            |row| row.get(0),
        )?)
    }

    /// Debts resolved in `[start, end)`.
    pub fn count_debts_resolved_between(
        &self,
        user_id: &str,
        start: DayKey,
        end: DayKey,
    ) -> Result<u32> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM execution_debts
             WHERE user_id = ?1 AND resolved_at >= ?2 AND resolved_at < ?3",
            params![user_id, midnight(start), midnight(end)],
            |row| row.get(0),
        )?)
    }

    // === Failure days ===

    pub fn failure_day(&self, user_id: &str, day: DayKey) -> Result<Option<FailureDay>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT user_id, day, note, created_at FROM failure_days WHERE user_id = ?1 AND day = ?2",
                params![user_id, day],
                row_to_failure,
            )
            .optional()?)
    }

    /// Returns false when the day was already a failure day.
    pub fn insert_failure_day(&self, failure: &FailureDay) -> Result<bool> {
        let changed = self.conn().execute(
            "INSERT INTO failure_days (user_id, day, note, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, day) DO NOTHING",
            params![failure.user_id, failure.day, failure.note, failure.created_at],
        )?;
        Ok(changed == 1)
    }

    pub fn count_failure_days_between(&self, user_id: &str, start: DayKey, end: DayKey) -> Result<u32> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM failure_days WHERE user_id = ?1 AND day >= ?2 AND day < ?3",
            params![user_id, start, end],
            |row| row.get(0),
        )?)
    }

    // === Daily wins ===

    pub fn daily_win(&self, user_id: &str, day: DayKey) -> Result<Option<DailyWin>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT user_id, day, satisfied_by, satisfied_at, goal_id
                 FROM daily_wins WHERE user_id = ?1 AND day = ?2",
                params![user_id, day],
                |row| {
                    Ok(DailyWin {
                        user_id: row.get(0)?,
                        day: row.get(1)?,
                        satisfied_by: parse_column::<SatisfiedBy>(row, 2)?,
                        satisfied_at: row.get(3)?,
                        goal_id: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// Create or refresh a day's win. `goal_id` is kept from the first write.
    pub fn upsert_daily_win(&self, win: &DailyWin) -> Result<()> {
        self.conn().execute(
            "INSERT INTO daily_wins (user_id, day, satisfied_by, satisfied_at, goal_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, day) DO UPDATE SET
                satisfied_by = excluded.satisfied_by,
                satisfied_at = excluded.satisfied_at",
            params![
                win.user_id,
                win.day,
                win.satisfied_by.to_string(),
                win.satisfied_at,
                win.goal_id,
            ],
        )?;
        Ok(())
    }

    // === Quiet weeks ===

    pub fn quiet_week(&self, user_id: &str, week_start: DayKey) -> Result<Option<QuietWeek>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT user_id, week_start, created_at FROM quiet_weeks
                 WHERE user_id = ?1 AND week_start = ?2",
                params![user_id, week_start],
                |row| {
                    Ok(QuietWeek {
                        user_id: row.get(0)?,
                        week_start: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    /// Returns false when the week was already quiet.
    pub fn insert_quiet_week(&self, week: &QuietWeek) -> Result<bool> {
        let changed = self.conn().execute(
            "INSERT INTO quiet_weeks (user_id, week_start, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, week_start) DO NOTHING",
            params![week.user_id, week.week_start, week.created_at],
        )?;
        Ok(changed == 1)
    }

    /// Latest quiet week starting strictly between `after` and `before`.
    pub fn latest_quiet_week_between(
        &self,
        user_id: &str,
        after: DayKey,
        before: DayKey,
    ) -> Result<Option<DayKey>> {
        // Exclusive lower bound: a quiet week exactly `cooldown` days back has
        // served its cooldown, so the default 14 days blocks only the next week.
        Ok(self
            .conn()
            .query_row(
                "SELECT week_start FROM quiet_weeks
                 WHERE user_id = ?1 AND week_start > ?2 AND week_start < ?3
                 ORDER BY week_start DESC LIMIT 1",
                params![user_id, after, before],
                |row| row.get(0),
            )
            .optional()?)
    }

    // === Weekly reviews and insights ===

    pub fn weekly_review(&self, user_id: &str, week_start: DayKey) -> Result<Option<WeeklyReview>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {REVIEW_COLUMNS} FROM weekly_reviews WHERE user_id = ?1 AND week_start = ?2"
                ),
                params![user_id, week_start],
                row_to_review,
            )
            .optional()?)
    }

    /// The `limit` most recent reviews, newest week first.
    pub fn recent_weekly_reviews(&self, user_id: &str, limit: u32) -> Result<Vec<WeeklyReview>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM weekly_reviews
             WHERE user_id = ?1 ORDER BY week_start DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![user_id, limit], row_to_review)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Returns false when the week already has a review.
    pub fn insert_weekly_review(&self, review: &WeeklyReview) -> Result<bool> {
        let a = &review.answers;
        let changed = self.conn().execute(
            &format!(
                "INSERT INTO weekly_reviews ({REVIEW_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(user_id, week_start) DO NOTHING"
            ),
            params![
                review.user_id,
                review.week_start,
                a.q1,
                a.q2,
                a.q3,
                a.q4,
                a.stop_doing,
                a.resistance_block,
                review.created_at,
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn upsert_weekly_insights(
        &self,
        user_id: &str,
        insights: &WeeklyInsights,
        now: NaiveDateTime,
    ) -> Result<()> {
        let by_category = serde_json::to_string(&insights.missed_by_category)?;
        let by_hour = serde_json::to_string(&insights.missed_by_hour)?;
        self.conn().execute(
            "INSERT INTO weekly_insights
                (user_id, week_start, missed_by_category, missed_by_hour, most_skipped_hour, trend, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, week_start) DO UPDATE SET
                missed_by_category = excluded.missed_by_category,
                missed_by_hour = excluded.missed_by_hour,
                most_skipped_hour = excluded.most_skipped_hour,
                trend = excluded.trend,
                updated_at = excluded.updated_at",
            params![
                user_id,
                insights.week_start,
                by_category,
                by_hour,
                insights.most_skipped_hour,
                insights.trend.as_str(),
                now,
            ],
        )?;
        Ok(())
    }

    pub fn weekly_insights_snapshot(
        &self,
        user_id: &str,
        week_start: DayKey,
    ) -> Result<Option<WeeklyInsights>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT week_start, missed_by_category, missed_by_hour, most_skipped_hour, trend
                 FROM weekly_insights WHERE user_id = ?1 AND week_start = ?2",
                params![user_id, week_start],
                |row| {
                    Ok(WeeklyInsights {
                        week_start: row.get(0)?,
                        missed_by_category: json_column::<BTreeMap<String, u32>>(row, 1)?,
                        missed_by_hour: json_column::<BTreeMap<u32, u32>>(row, 2)?,
                        most_skipped_hour: row.get(3)?,
                        trend: parse_column::<Trend>(row, 4)?,
                    })
                },
            )
            .optional()?)
    }

    // === Block annotations ===

    pub fn upsert_resistance(&self, resistance: &BlockResistance) -> Result<()> {
        self.conn().execute(
            "INSERT INTO block_resistances (user_id, block_id, day, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, block_id, day) DO UPDATE SET
                reason = excluded.reason,
                created_at = excluded.created_at",
            params![
                resistance.user_id,
                resistance.block_id,
                resistance.day,
                resistance.reason,
                resistance.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn resistance(
        &self,
        user_id: &str,
        block_id: &str,
        day: DayKey,
    ) -> Result<Option<BlockResistance>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT user_id, block_id, day, reason, created_at FROM block_resistances
                 WHERE user_id = ?1 AND block_id = ?2 AND day = ?3",
                params![user_id, block_id, day],
                |row| {
                    Ok(BlockResistance {
                        user_id: row.get(0)?,
                        block_id: row.get(1)?,
                        day: row.get(2)?,
                        reason: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn upsert_next_action(&self, next: &NextAction) -> Result<()> {
        self.conn().execute(
            "INSERT INTO next_actions (user_id, block_id, day, action, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, block_id, day) DO UPDATE SET
                action = excluded.action,
                updated_at = excluded.updated_at",
            params![next.user_id, next.block_id, next.day, next.action, next.updated_at],
        )?;
        Ok(())
    }

    /// Next actions declared for `day`, in block order.
    pub fn next_actions_for_day(&self, user_id: &str, day: DayKey) -> Result<Vec<NextAction>> {
        let mut stmt = self.conn().prepare(
            "SELECT n.user_id, n.block_id, n.day, n.action, n.updated_at
             FROM next_actions n
             LEFT JOIN schedule_blocks b ON b.id = n.block_id
             WHERE n.user_id = ?1 AND n.day = ?2
             ORDER BY b.start_minute ASC, n.block_id ASC",
        )?;
        let rows = stmt.query_map(params![user_id, day], row_to_next_action)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
