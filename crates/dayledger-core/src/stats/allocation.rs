//! Where the user's mandatory time actually went.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::LedgerDb;
use crate::time::{add_days, week_start, DayKey};

/// Minutes credited per resolved debt
const RECOVERY_CREDIT_MINUTES: u32 = 30;

/// Mandatory block slots over a trailing window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAllocation {
    /// Mandatory block slots completed
    pub executed: u32,
    /// Mandatory block slots not completed
    pub missed: u32,
    /// Debts opened in the window and since resolved
    pub recovered: u32,
}

/// Planned versus executed mandatory minutes for one week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTimeReality {
    pub week_start: DayKey,
    pub planned_minutes: u32,
    pub executed_minutes: u32,
    pub recovered_minutes: u32,
}

/// Mandatory slots over the `window_days` days ending `today`.
pub fn time_allocation(
    db: &LedgerDb,
    user_id: &str,
    window_days: u32,
    today: DayKey,
) -> Result<TimeAllocation> {
    let start = add_days(today, 1 - i64::from(window_days))?;
    let end = add_days(today, 1)?;

    db.with_transaction(|db| {
        let blocks = db.mandatory_blocks(user_id)?;
        let completions = db.block_completions_between(user_id, start, end)?;
        let executed = completions
            .iter()
            .filter(|(block_id, _)| blocks.iter().any(|b| &b.id == block_id))
            .count() as u32;
        let total_slots = (blocks.len() as u32).saturating_mul(window_days);

        Ok(TimeAllocation {
            executed,
            missed: total_slots.saturating_sub(executed),
            recovered: db.count_resolved_debts_created_between(user_id, start, end)?,
        })
    })
}

/// Planned, executed and recovered minutes for the week containing `day`.
pub fn weekly_time_reality(db: &LedgerDb, user_id: &str, day: DayKey) -> Result<WeeklyTimeReality> {
    let ws = week_start(day);
    let we = add_days(ws, 7)?;

    db.with_transaction(|db| {
        let blocks = db.mandatory_blocks(user_id)?;
        let planned_minutes = blocks.iter().map(|b| b.duration_minutes()).sum::<u32>() * 7;
        let completions = db.block_completions_between(user_id, ws, we)?;
        let executed_minutes = completions
            .iter()
            .filter_map(|(block_id, _)| blocks.iter().find(|b| &b.id == block_id))
            .map(|b| b.duration_minutes())
            .sum();
        let recovered = db.count_debts_resolved_between(user_id, ws, we)?;

        Ok(WeeklyTimeReality {
            week_start: ws,
            planned_minutes,
            executed_minutes,
            recovered_minutes: recovered * RECOVERY_CREDIT_MINUTES,
        })
    })
}
