//! Failure days: user-declared days exempt from execution debt.
//!
//! Each plan cycle allows a small number of them. Logging one supersedes any
//! debt already opened for the same day.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result, ValidationError};
use crate::progress::recompute_day;
use crate::storage::{LedgerDb, RulesConfig};
use crate::time::{add_days, DayKey};

/// A declared failure day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDay {
    pub user_id: String,
    pub day: DayKey,
    /// Why the day was written off (required)
    pub note: String,
    pub created_at: NaiveDateTime,
}

/// Failure-day usage within the cycle that covers a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleAllowance {
    /// First day of the cycle
    pub cycle_start: DayKey,
    /// First day after the cycle
    pub cycle_end: DayKey,
    /// Failure days already logged in the cycle
    pub used: u32,
    /// Failure days allowed per cycle
    pub cap: u32,
}

impl CycleAllowance {
    pub fn remaining(&self) -> u32 {
        self.cap.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.cap
    }
}

/// The `[start, end)` cycle covering `day`.
///
/// This is the covering plan when there is one, otherwise the trailing
/// `default_cycle_days` window that ends on `day`.
pub fn cycle_window(
    db: &LedgerDb,
    user_id: &str,
    day: DayKey,
    rules: &RulesConfig,
) -> Result<(DayKey, DayKey)> {
    Ok(match db.plan_for_day(user_id, day)? {
        Some(plan) => (plan.start_day, plan.end_day()),
        None => {
            let days = i64::from(rules.default_cycle_days.max(1));
            (add_days(day, 1 - days)?, add_days(day, 1)?)
        }
    })
}

pub fn failure_days_in_cycle(
    db: &LedgerDb,
    user_id: &str,
    day: DayKey,
    rules: &RulesConfig,
) -> Result<CycleAllowance> {
    let (cycle_start, cycle_end) = cycle_window(db, user_id, day, rules)?;
    let used = db.count_failure_days_between(user_id, cycle_start, cycle_end)?;
    Ok(CycleAllowance {
        cycle_start,
        cycle_end,
        used,
        cap: rules.failure_day_cap,
    })
}

/// Declare `day` a failure day.
///
/// # Errors
/// - `Validation` when the note is blank
/// - `AlreadyExists` when the day is already a failure day
/// - `LimitReached` when the cycle's allowance is used up
pub fn log_failure_day(
    db: &LedgerDb,
    user_id: &str,
    day: DayKey,
    note: &str,
    now: NaiveDateTime,
    rules: &RulesConfig,
) -> Result<FailureDay> {
    let note = note.trim();
    if note.is_empty() {
        return Err(ValidationError::EmptyField("note").into());
    }

    db.with_transaction(|db| {
        if db.failure_day(user_id, day)?.is_some() {
            return Err(already_logged(day));
        }
        let allowance = failure_days_in_cycle(db, user_id, day, rules)?;
        if allowance.is_exhausted() {
            return Err(CoreError::LimitReached {
                limit: allowance.cap,
                cycle_start: allowance.cycle_start,
                cycle_end: allowance.cycle_end,
            });
        }

        let failure = FailureDay {
            user_id: user_id.to_string(),
            day,
            note: note.to_string(),
            created_at: now,
        };
        if !db.insert_failure_day(&failure)? {
            return Err(already_logged(day));
        }
        if db.delete_debt_for_day(user_id, day)? {
            info!(user = user_id, %day, "execution debt superseded by failure day");
        }
        info!(
            user = user_id,
            %day,
            remaining = allowance.remaining() - 1,
            "failure day logged"
        );

        recompute_day(db, user_id, day, now)?;
        Ok(failure)
    })
}

fn already_logged(day: DayKey) -> CoreError {
    CoreError::AlreadyExists {
        entity: "FailureDay",
        key: day.to_string(),
    }
}
