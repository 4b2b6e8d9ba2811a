//! Execution debt manager.
//!
//! A debt is opened lazily when a past day turns out to have missed mandatory
//! blocks. Debts are per missed day, but any single unresolved debt blocks
//! completion of every day until the user resolves it. Debts never expire on
//! their own.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};
use crate::storage::LedgerDb;
use crate::time::{is_past_day, DayKey};

/// Missed block names quoted in a debt's reason.
const REASON_BLOCK_LIMIT: usize = 3;

/// How a debt was paid back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionType {
    ExtraTime,
    ExtraOutput,
}

impl ResolutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionType::ExtraTime => "extra_time",
            ResolutionType::ExtraOutput => "extra_output",
        }
    }
}

impl fmt::Display for ResolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('-', "_").to_ascii_lowercase().as_str() {
            "extra_time" | "extratime" => Ok(ResolutionType::ExtraTime),
            "extra_output" | "extraoutput" => Ok(ResolutionType::ExtraOutput),
            other => Err(ValidationError::InvalidValue {
                field: "resolution_type",
                message: format!("expected extra_time or extra_output, got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDebt {
    pub id: String,
    pub user_id: String,
    pub missed_day: DayKey,
    pub reason: String,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
    pub resolution_type: Option<ResolutionType>,
    pub resolution_note: Option<String>,
}

impl ExecutionDebt {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// The day the debt is expected to be worked off.
    pub fn due_day(&self) -> Option<DayKey> {
        self.missed_day.succ_opt()
    }
}

fn debt_reason(missed: &[&str]) -> String {
    let names: Vec<&str> = missed.iter().take(REASON_BLOCK_LIMIT).copied().collect();
    format!("Missed mandatory blocks: {}", names.join(", "))
}

/// Open a debt for `day` if it is a past day with missed mandatory blocks.
///
/// Returns the day's debt (new or pre-existing), or `None` when the day owes
/// nothing: today or later, covered by a failure day, no mandatory blocks, or
/// every mandatory block done. The insert relies on the unique
/// `(user_id, missed_day)` index, so concurrent calls converge on one row.
pub fn ensure_debt_for_missed_day(
    db: &LedgerDb,
    user_id: &str,
    day: DayKey,
    now: NaiveDateTime,
) -> Result<Option<ExecutionDebt>> {
    if !is_past_day(day, now.date()) {
        return Ok(None);
    }

    db.with_transaction(|db| {
        if db.failure_day(user_id, day)?.is_some() {
            return Ok(None);
        }
        if let Some(existing) = db.debt_for_day(user_id, day)? {
            return Ok(Some(existing));
        }

        let mandatory = db.mandatory_blocks(user_id)?;
        if mandatory.is_empty() {
            return Ok(None);
        }
        let completed = db.completed_block_ids(user_id, day)?;
        let missed: Vec<&str> = mandatory
            .iter()
            .filter(|b| !completed.contains(&b.id))
            .map(|b| b.name.as_str())
            .collect();
        if missed.is_empty() {
            return Ok(None);
        }

        let debt = ExecutionDebt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            missed_day: day,
            reason: debt_reason(&missed),
            created_at: now,
            resolved_at: None,
            resolution_type: None,
            resolution_note: None,
        };
        if db.insert_debt_if_absent(&debt)? {
            info!(user = user_id, %day, missed = missed.len(), "execution debt opened");
        }
        db.debt_for_day(user_id, day)
    })
}

/// Resolve a debt owned by `user_id`.
///
/// Re-resolving an already resolved debt overwrites its resolution.
pub fn resolve_debt(
    db: &LedgerDb,
    user_id: &str,
    debt_id: &str,
    resolution_type: ResolutionType,
    note: &str,
    now: NaiveDateTime,
) -> Result<ExecutionDebt> {
    let debt = db
        .debt(user_id, debt_id)?
        .ok_or_else(|| CoreError::not_found("ExecutionDebt", debt_id))?;
    let note = note.trim();
    if note.is_empty() {
        return Err(ValidationError::EmptyField("note").into());
    }

    db.resolve_debt_row(user_id, debt_id, resolution_type, note, now)?;
    info!(
        user = user_id,
        missed_day = %debt.missed_day,
        resolution = %resolution_type,
        "execution debt resolved"
    );

    Ok(ExecutionDebt {
        resolved_at: Some(now),
        resolution_type: Some(resolution_type),
        resolution_note: Some(note.to_string()),
        ..debt
    })
}

/// All unresolved debts, oldest first.
pub fn get_unresolved_debt(db: &LedgerDb, user_id: &str) -> Result<Vec<ExecutionDebt>> {
    db.unresolved_debts(user_id)
}
