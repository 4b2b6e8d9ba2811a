//! Per-block annotations: why a mandatory block was resisted, and the next
//! action declared before it starts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};
use crate::schedule::ScheduleBlock;
use crate::storage::LedgerDb;
use crate::time::{day_key, minute_of_day, DayKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResistance {
    pub user_id: String,
    pub block_id: String,
    pub day: DayKey,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub user_id: String,
    pub block_id: String,
    pub day: DayKey,
    pub action: String,
    pub updated_at: NaiveDateTime,
}

fn owned_block(db: &LedgerDb, user_id: &str, block_id: &str) -> Result<ScheduleBlock> {
    db.block(user_id, block_id)?
        .ok_or_else(|| CoreError::not_found("ScheduleBlock", block_id))
}

/// Record why a mandatory block was skipped on `day`.
///
/// Only an incomplete mandatory block can carry a resistance reason. Logging
/// again for the same block and day replaces the reason.
pub fn log_resistance(
    db: &LedgerDb,
    user_id: &str,
    block_id: &str,
    day: DayKey,
    reason: &str,
    now: NaiveDateTime,
) -> Result<BlockResistance> {
    let block = owned_block(db, user_id, block_id)?;
    if !block.mandatory {
        return Err(ValidationError::InvalidValue {
            field: "block_id",
            message: format!("'{}' is not a mandatory block", block.name),
        }
        .into());
    }
    if db.is_block_completed(user_id, block_id, day)? {
        return Err(ValidationError::InvalidValue {
            field: "block_id",
            message: format!("'{}' is already completed on {day}", block.name),
        }
        .into());
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::EmptyField("reason").into());
    }

    let resistance = BlockResistance {
        user_id: user_id.to_string(),
        block_id: block.id,
        day,
        reason: reason.to_string(),
        created_at: now,
    };
    db.upsert_resistance(&resistance)?;
    Ok(resistance)
}

/// Declare the first concrete step for a block on `day`.
///
/// The action can be edited until the block starts, then it is frozen.
pub fn set_next_action(
    db: &LedgerDb,
    user_id: &str,
    block_id: &str,
    day: DayKey,
    action: &str,
    now: NaiveDateTime,
) -> Result<NextAction> {
    let block = owned_block(db, user_id, block_id)?;
    let action = action.trim();
    if action.is_empty() {
        return Err(ValidationError::EmptyField("action").into());
    }
    let today = day_key(now);
    let started = day < today || (day == today && minute_of_day(now) >= block.start_minute);
    if started {
        return Err(ValidationError::InvalidValue {
            field: "action",
            message: format!("'{}' has already started; its next action is locked", block.name),
        }
        .into());
    }

    let next = NextAction {
        user_id: user_id.to_string(),
        block_id: block.id,
        day,
        action: action.to_string(),
        updated_at: now,
    };
    db.upsert_next_action(&next)?;
    Ok(next)
}
