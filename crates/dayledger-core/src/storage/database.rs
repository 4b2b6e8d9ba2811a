//! SQLite-backed ledger storage.
//!
//! Holds both the records collaborators produce (schedule blocks, plans and
//! their tasks, block completions, goal artifacts, per-user settings) and the
//! records the engine derives from them. Every mutating write is an upsert
//! keyed by a natural uniqueness constraint so repeated or concurrent
//! identical requests converge on the same stored state.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use super::migrations;
use crate::error::{CoreError, DatabaseError, Result};
use crate::output::{GoalArtifact, OutputType};
use crate::schedule::{BlockCategory, NewBlock, NewTask, Plan, PlanTask, ScheduleBlock};
use crate::time::DayKey;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS schedule_blocks (
    id           TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL,
    name         TEXT NOT NULL,
    start_minute INTEGER NOT NULL,
    end_minute   INTEGER NOT NULL,
    category     TEXT NOT NULL,
    mandatory    INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_blocks_user ON schedule_blocks(user_id, mandatory);

CREATE TABLE IF NOT EXISTS plans (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    name          TEXT NOT NULL,
    start_day     TEXT NOT NULL,
    duration_days INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_plans_user ON plans(user_id, start_day);

CREATE TABLE IF NOT EXISTS tasks (
    id           TEXT PRIMARY KEY,
    plan_id      TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    day          TEXT NOT NULL,
    title        TEXT NOT NULL,
    category     TEXT,
    mandatory    INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_tasks_plan_day ON tasks(plan_id, day);

CREATE TABLE IF NOT EXISTS block_completions (
    user_id    TEXT NOT NULL,
    block_id   TEXT NOT NULL,
    day        TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, block_id, day)
);
CREATE INDEX IF NOT EXISTS idx_block_completions_day ON block_completions(user_id, day);

CREATE TABLE IF NOT EXISTS daily_completions (
    user_id               TEXT NOT NULL,
    day                   TEXT NOT NULL,
    output_type           TEXT,
    output_content        TEXT,
    mandatory_blocks_done INTEGER NOT NULL DEFAULT 0,
    mandatory_tasks_done  INTEGER NOT NULL DEFAULT 0,
    output_ready          INTEGER NOT NULL DEFAULT 0,
    completed_at          TEXT,
    PRIMARY KEY (user_id, day)
);

CREATE TABLE IF NOT EXISTS execution_debts (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    missed_day      TEXT NOT NULL,
    reason          TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    resolved_at     TEXT,
    resolution_type TEXT,
    resolution_note TEXT
);
CREATE INDEX IF NOT EXISTS idx_debts_unresolved ON execution_debts(user_id, resolved_at, created_at);

CREATE TABLE IF NOT EXISTS failure_days (
    user_id    TEXT NOT NULL,
    day        TEXT NOT NULL,
    note       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, day)
);

CREATE TABLE IF NOT EXISTS daily_wins (
    user_id      TEXT NOT NULL,
    day          TEXT NOT NULL,
    satisfied_by TEXT NOT NULL,
    satisfied_at TEXT NOT NULL,
    goal_id      TEXT,
    PRIMARY KEY (user_id, day)
);

CREATE TABLE IF NOT EXISTS quiet_weeks (
    user_id    TEXT NOT NULL,
    week_start TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, week_start)
);

CREATE TABLE IF NOT EXISTS weekly_reviews (
    user_id          TEXT NOT NULL,
    week_start       TEXT NOT NULL,
    q1               TEXT NOT NULL DEFAULT '',
    q2               TEXT NOT NULL DEFAULT '',
    q3               TEXT NOT NULL DEFAULT '',
    q4               TEXT NOT NULL DEFAULT '',
    stop_doing       TEXT NOT NULL DEFAULT '',
    resistance_block TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL,
    PRIMARY KEY (user_id, week_start)
);

CREATE TABLE IF NOT EXISTS weekly_insights (
    user_id            TEXT NOT NULL,
    week_start         TEXT NOT NULL,
    missed_by_category TEXT NOT NULL DEFAULT '{}',
    missed_by_hour     TEXT NOT NULL DEFAULT '{}',
    most_skipped_hour  INTEGER,
    trend              TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    PRIMARY KEY (user_id, week_start)
);

CREATE TABLE IF NOT EXISTS block_resistances (
    user_id    TEXT NOT NULL,
    block_id   TEXT NOT NULL,
    day        TEXT NOT NULL,
    reason     TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, block_id, day)
);

CREATE TABLE IF NOT EXISTS next_actions (
    user_id    TEXT NOT NULL,
    block_id   TEXT NOT NULL,
    day        TEXT NOT NULL,
    action     TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, block_id, day)
);

CREATE TABLE IF NOT EXISTS goal_artifacts (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    goal_id    TEXT NOT NULL,
    day        TEXT NOT NULL,
    kind       TEXT NOT NULL,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_artifacts_goal_day ON goal_artifacts(user_id, goal_id, day);

CREATE TABLE IF NOT EXISTS user_settings (
    user_id            TEXT PRIMARY KEY,
    daily_win_type     TEXT,
    daily_win_block_id TEXT,
    active_goal_id     TEXT
);
";

/// Read a TEXT column into any `FromStr` type, surfacing bad values as conversion failures.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Nullable variant of [`parse_column`].
pub(crate) fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn row_to_block(row: &Row<'_>) -> rusqlite::Result<ScheduleBlock> {
    Ok(ScheduleBlock {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        start_minute: row.get(3)?,
        end_minute: row.get(4)?,
        category: parse_column::<BlockCategory>(row, 5)?,
        mandatory: row.get(6)?,
    })
}

fn row_to_plan(row: &Row<'_>) -> rusqlite::Result<Plan> {
    Ok(Plan {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        start_day: row.get(3)?,
        duration_days: row.get(4)?,
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<PlanTask> {
    Ok(PlanTask {
        id: row.get(0)?,
        plan_id: row.get(1)?,
        user_id: row.get(2)?,
        day: row.get(3)?,
        title: row.get(4)?,
        category: row.get(5)?,
        mandatory: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

fn row_to_artifact(row: &Row<'_>) -> rusqlite::Result<GoalArtifact> {
    Ok(GoalArtifact {
        id: row.get(0)?,
        user_id: row.get(1)?,
        goal_id: row.get(2)?,
        day: row.get(3)?,
        kind: parse_column::<OutputType>(row, 4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const BLOCK_COLUMNS: &str = "id, user_id, name, start_minute, end_minute, category, mandatory";
const TASK_COLUMNS: &str = "id, plan_id, user_id, day, title, category, mandatory, completed_at";

/// Completion and failure history read from one consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// Days whose `completed_at` is set, ascending.
    pub completed_days: Vec<DayKey>,
    /// Declared failure days, ascending.
    pub failure_days: Vec<DayKey>,
}

impl HistorySnapshot {
    pub fn completed_set(&self) -> BTreeSet<DayKey> {
        self.completed_days.iter().copied().collect()
    }
}

/// SQLite database for the ledger.
pub struct LedgerDb {
    conn: Connection,
}

impl LedgerDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/dayledger.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("dayledger.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and one-off evaluation).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.busy_timeout(Duration::from_secs(5))?;
        self.conn.execute_batch(SCHEMA)?;
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Run `f` inside a transaction, or directly when one is already open.
    ///
    /// Nested calls join the outer transaction instead of failing. The write
    /// lock is taken up front (`BEGIN IMMEDIATE`) so two connections racing on
    /// a read-then-write wait on `busy_timeout` rather than deadlocking on the
    /// lock upgrade.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f(self);
        }
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // === Schedule blocks ===

    /// Insert a validated block for `user_id`.
    pub fn insert_block(&self, user_id: &str, block: &NewBlock, now: NaiveDateTime) -> Result<ScheduleBlock> {
        let existing = self.blocks(user_id)?;
        block.validate(&existing)?;
        let stored = ScheduleBlock {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: block.name.trim().to_string(),
            start_minute: block.start_minute,
            end_minute: block.end_minute,
            category: block.category,
            mandatory: block.mandatory,
        };
        self.conn.execute(
            "INSERT INTO schedule_blocks (id, user_id, name, start_minute, end_minute, category, mandatory, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id,
                stored.user_id,
                stored.name,
                stored.start_minute,
                stored.end_minute,
                stored.category.as_str(),
                stored.mandatory,
                now,
            ],
        )?;
        Ok(stored)
    }

    /// All blocks for a user, ordered by start time.
    pub fn blocks(&self, user_id: &str) -> Result<Vec<ScheduleBlock>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM schedule_blocks WHERE user_id = ?1 ORDER BY start_minute ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_block)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Mandatory blocks for a user, ordered by start time.
    pub fn mandatory_blocks(&self, user_id: &str) -> Result<Vec<ScheduleBlock>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM schedule_blocks
             WHERE user_id = ?1 AND mandatory = 1 ORDER BY start_minute ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_block)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// A block owned by `user_id`, if any.
    pub fn block(&self, user_id: &str, block_id: &str) -> Result<Option<ScheduleBlock>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {BLOCK_COLUMNS} FROM schedule_blocks WHERE user_id = ?1 AND id = ?2"),
                params![user_id, block_id],
                row_to_block,
            )
            .optional()?)
    }

    // === Block completions ===

    /// Mark a block completed for a day. Returns false if it already was.
    pub fn insert_block_completion(
        &self,
        user_id: &str,
        block_id: &str,
        day: DayKey,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO block_completions (user_id, block_id, day, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, block_id, day) DO NOTHING",
            params![user_id, block_id, day, now],
        )?;
        Ok(changed == 1)
    }

    /// Remove a block completion. Returns false if none existed.
    pub fn delete_block_completion(&self, user_id: &str, block_id: &str, day: DayKey) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM block_completions WHERE user_id = ?1 AND block_id = ?2 AND day = ?3",
            params![user_id, block_id, day],
        )?;
        Ok(changed == 1)
    }

    pub fn is_block_completed(&self, user_id: &str, block_id: &str, day: DayKey) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM block_completions WHERE user_id = ?1 AND block_id = ?2 AND day = ?3",
                params![user_id, block_id, day],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Ids of blocks completed on `day`.
    pub fn completed_block_ids(&self, user_id: &str, day: DayKey) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT block_id FROM block_completions WHERE user_id = ?1 AND day = ?2")?;
        let rows = stmt.query_map(params![user_id, day], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<HashSet<_>>>()?)
    }

    /// `(block_id, day)` pairs completed in `[start, end)`.
    pub fn block_completions_between(
        &self,
        user_id: &str,
        start: DayKey,
        end: DayKey,
    ) -> Result<HashSet<(String, DayKey)>> {
        let mut stmt = self.conn.prepare(
            "SELECT block_id, day FROM block_completions
             WHERE user_id = ?1 AND day >= ?2 AND day < ?3",
        )?;
        let rows = stmt.query_map(params![user_id, start, end], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, DayKey>(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<HashSet<_>>>()?)
    }

    // === Plans and tasks ===

    pub fn create_plan(
        &self,
        user_id: &str,
        name: &str,
        start_day: DayKey,
        duration_days: u32,
    ) -> Result<Plan> {
        Plan::validate_duration(duration_days)?;
        let plan = Plan {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            start_day,
            duration_days,
        };
        self.conn.execute(
            "INSERT INTO plans (id, user_id, name, start_day, duration_days) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![plan.id, plan.user_id, plan.name, plan.start_day, plan.duration_days],
        )?;
        Ok(plan)
    }

    /// The most recently started plan whose cycle covers `day`.
    pub fn plan_for_day(&self, user_id: &str, day: DayKey) -> Result<Option<Plan>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, start_day, duration_days FROM plans
             WHERE user_id = ?1 AND start_day <= ?2
             ORDER BY start_day DESC",
        )?;
        let plans = stmt.query_map(params![user_id, day], row_to_plan)?;
        for plan in plans {
            let plan = plan?;
            if plan.covers(day) {
                return Ok(Some(plan));
            }
        }
        Ok(None)
    }

    pub fn insert_task(&self, user_id: &str, plan_id: &str, task: &NewTask) -> Result<PlanTask> {
        let owned: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM plans WHERE id = ?1 AND user_id = ?2",
                params![plan_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(CoreError::not_found("Plan", plan_id));
        }
        let stored = PlanTask {
            id: Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            user_id: user_id.to_string(),
            day: task.day,
            title: task.title.clone(),
            category: task.category.clone(),
            mandatory: task.mandatory,
            completed_at: None,
        };
        self.conn.execute(
            "INSERT INTO tasks (id, plan_id, user_id, day, title, category, mandatory, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
            params![
                stored.id,
                stored.plan_id,
                stored.user_id,
                stored.day,
                stored.title,
                stored.category,
                stored.mandatory,
            ],
        )?;
        Ok(stored)
    }

    pub fn task(&self, user_id: &str, task_id: &str) -> Result<Option<PlanTask>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 AND id = ?2"),
                params![user_id, task_id],
                row_to_task,
            )
            .optional()?)
    }

    /// Tasks of one plan dated `day`.
    pub fn plan_tasks_for_day(&self, plan_id: &str, day: DayKey) -> Result<Vec<PlanTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE plan_id = ?1 AND day = ?2 ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map(params![plan_id, day], row_to_task)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every task of `user_id` dated in `[start, end)`, whatever plan it belongs to.
    pub fn tasks_between(&self, user_id: &str, start: DayKey, end: DayKey) -> Result<Vec<PlanTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1 AND day >= ?2 AND day < ?3 ORDER BY day ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![user_id, start, end], row_to_task)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_task_completed_at(
        &self,
        user_id: &str,
        task_id: &str,
        completed_at: Option<NaiveDateTime>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET completed_at = ?3 WHERE user_id = ?1 AND id = ?2",
            params![user_id, task_id, completed_at],
        )?;
        Ok(())
    }

    // === Goal artifacts and settings ===

    pub fn set_active_goal(&self, user_id: &str, goal_id: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_settings (user_id, active_goal_id) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET active_goal_id = excluded.active_goal_id",
            params![user_id, goal_id],
        )?;
        Ok(())
    }

    pub fn active_goal(&self, user_id: &str) -> Result<Option<String>> {
        let goal: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT active_goal_id FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(goal.flatten())
    }

    /// Raw daily-win settings: `(type, block_id)`.
    pub(crate) fn daily_win_settings(&self, user_id: &str) -> Result<Option<(Option<String>, Option<String>)>> {
        Ok(self
            .conn
            .query_row(
                "SELECT daily_win_type, daily_win_block_id FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?)
    }

    pub(crate) fn set_daily_win_settings(
        &self,
        user_id: &str,
        win_type: &str,
        block_id: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_settings (user_id, daily_win_type, daily_win_block_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                daily_win_type = excluded.daily_win_type,
                daily_win_block_id = excluded.daily_win_block_id",
            params![user_id, win_type, block_id],
        )?;
        Ok(())
    }

    pub fn insert_artifact(
        &self,
        user_id: &str,
        goal_id: &str,
        day: DayKey,
        kind: OutputType,
        content: &str,
        now: NaiveDateTime,
    ) -> Result<GoalArtifact> {
        let artifact = GoalArtifact {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            goal_id: goal_id.to_string(),
            day,
            kind,
            content: content.to_string(),
            created_at: now,
        };
        self.conn.execute(
            "INSERT INTO goal_artifacts (id, user_id, goal_id, day, kind, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                artifact.id,
                artifact.user_id,
                artifact.goal_id,
                artifact.day,
                artifact.kind.as_str(),
                artifact.content,
                artifact.created_at,
            ],
        )?;
        Ok(artifact)
    }

    pub fn has_artifact(&self, user_id: &str, goal_id: &str, day: DayKey) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM goal_artifacts WHERE user_id = ?1 AND goal_id = ?2 AND day = ?3 LIMIT 1",
                params![user_id, goal_id, day],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Artifacts dated in `[start, end)`, newest day first and newest
    /// capture first within a day. `None` reads every goal.
    pub fn artifacts_between(
        &self,
        user_id: &str,
        goal_id: Option<&str>,
        start: DayKey,
        end: DayKey,
    ) -> Result<Vec<GoalArtifact>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, goal_id, day, kind, content, created_at FROM goal_artifacts
             WHERE user_id = ?1 AND (?2 IS NULL OR goal_id = ?2) AND day >= ?3 AND day < ?4
             ORDER BY day DESC, created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user_id, goal_id, start, end], row_to_artifact)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // === History ===

    /// Load completion and failure history in a single read transaction.
    pub fn history_snapshot(&self, user_id: &str) -> Result<HistorySnapshot> {
        self.with_transaction(|db| {
            let completed_days = db.day_column(
                "SELECT day FROM daily_completions
                 WHERE user_id = ?1 AND completed_at IS NOT NULL ORDER BY day ASC",
                user_id,
            )?;
            let failure_days = db.day_column(
                "SELECT day FROM failure_days WHERE user_id = ?1 ORDER BY day ASC",
                user_id,
            )?;
            Ok(HistorySnapshot {
                completed_days,
                failure_days,
            })
        })
    }

    fn day_column(&self, sql: &str, user_id: &str) -> Result<Vec<DayKey>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, DayKey>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::NaiveDate;

    fn day(d: u32) -> DayKey {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        day(4).and_hms_opt(9, 0, 0).unwrap()
    }

    fn gym() -> NewBlock {
        NewBlock {
            name: "Gym".into(),
            start_minute: 360,
            end_minute: 420,
            category: BlockCategory::Health,
            mandatory: true,
        }
    }

    #[test]
    fn insert_and_list_blocks() {
        let db = LedgerDb::open_memory().unwrap();
        let block = db.insert_block("u1", &gym(), now()).unwrap();
        assert_eq!(db.blocks("u1").unwrap(), vec![block.clone()]);
        assert_eq!(db.mandatory_blocks("u1").unwrap().len(), 1);
        assert!(db.blocks("u2").unwrap().is_empty());
        assert_eq!(db.block("u1", &block.id).unwrap(), Some(block.clone()));
        assert!(db.block("u2", &block.id).unwrap().is_none());
    }

    #[test]
    fn overlapping_block_is_rejected() {
        let db = LedgerDb::open_memory().unwrap();
        db.insert_block("u1", &gym(), now()).unwrap();
        assert!(db.insert_block("u1", &gym(), now()).is_err());
        // Another user's timetable is independent
        assert!(db.insert_block("u2", &gym(), now()).is_ok());
    }

    #[test]
    fn block_completion_is_unique_per_day() {
        let db = LedgerDb::open_memory().unwrap();
        let block = db.insert_block("u1", &gym(), now()).unwrap();
        assert!(db.insert_block_completion("u1", &block.id, day(4), now()).unwrap());
        assert!(!db.insert_block_completion("u1", &block.id, day(4), now()).unwrap());
        assert!(db.is_block_completed("u1", &block.id, day(4)).unwrap());
        assert!(!db.is_block_completed("u1", &block.id, day(5)).unwrap());
        assert!(db.delete_block_completion("u1", &block.id, day(4)).unwrap());
        assert!(!db.delete_block_completion("u1", &block.id, day(4)).unwrap());
    }

    #[test]
    fn plan_for_day_prefers_latest_covering_plan() {
        let db = LedgerDb::open_memory().unwrap();
        db.create_plan("u1", "Old", day(1), 30).unwrap();
        let newer = db.create_plan("u1", "New", day(3), 7).unwrap();
        assert_eq!(db.plan_for_day("u1", day(4)).unwrap().unwrap().id, newer.id);
        // Past the newer plan's end, the older one still covers the day
        assert_eq!(db.plan_for_day("u1", day(12)).unwrap().unwrap().name, "Old");
        assert!(db.plan_for_day("u1", NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()).unwrap().is_none());
    }

    #[test]
    fn create_plan_rejects_unbounded_durations() {
        let db = LedgerDb::open_memory().unwrap();
        for days in [0, u32::MAX] {
            assert!(matches!(
                db.create_plan("u1", "Forever", day(1), days),
                Err(CoreError::Validation(ValidationError::InvalidValue { field: "duration_days", .. }))
            ));
        }
        assert!(db.plan_for_day("u1", day(4)).unwrap().is_none());
    }

    #[test]
    fn task_completion_toggles() {
        let db = LedgerDb::open_memory().unwrap();
        let plan = db.create_plan("u1", "Cycle", day(1), 30).unwrap();
        let task = db
            .insert_task(
                "u1",
                &plan.id,
                &NewTask {
                    day: day(4),
                    title: "Ship draft".into(),
                    category: None,
                    mandatory: true,
                },
            )
            .unwrap();
        db.set_task_completed_at("u1", &task.id, Some(now())).unwrap();
        assert_eq!(db.task("u1", &task.id).unwrap().unwrap().completed_at, Some(now()));
        assert_eq!(db.plan_tasks_for_day(&plan.id, day(4)).unwrap().len(), 1);
        assert!(db.task("u2", &task.id).unwrap().is_none());

        let foreign = NewTask {
            day: day(4),
            title: "Sneak in".into(),
            category: None,
            mandatory: true,
        };
        assert!(matches!(
            db.insert_task("u2", &plan.id, &foreign),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn artifacts_are_scoped_to_goal() {
        let db = LedgerDb::open_memory().unwrap();
        db.set_active_goal("u1", Some("g1")).unwrap();
        assert_eq!(db.active_goal("u1").unwrap().as_deref(), Some("g1"));
        db.insert_artifact("u1", "g1", day(4), OutputType::Text, "Wrote the intro", now())
            .unwrap();
        assert!(db.has_artifact("u1", "g1", day(4)).unwrap());
        assert!(!db.has_artifact("u1", "g2", day(4)).unwrap());
    }

    #[test]
    fn nested_transactions_join_outer() {
        let db = LedgerDb::open_memory().unwrap();
        let result = db.with_transaction(|outer| outer.with_transaction(|inner| inner.blocks("u1")));
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn open_at_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let db = LedgerDb::open_at(&path).unwrap();
            db.insert_block("u1", &gym(), now()).unwrap();
        }
        let reopened = LedgerDb::open_at(&path).unwrap();
        assert_eq!(reopened.blocks("u1").unwrap().len(), 1);
    }
}
