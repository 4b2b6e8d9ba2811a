//! Quiet mode gate.
//!
//! A quiet week hides streaks for one Sunday-aligned week. Two quiet weeks must
//! start at least `quiet_cooldown_days` apart.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};
use crate::storage::{LedgerDb, RulesConfig};
use crate::time::{add_days, week_start, DayKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietWeek {
    pub user_id: String,
    pub week_start: DayKey,
    pub created_at: NaiveDateTime,
}

/// Most recent quiet week still inside the cooldown for the week of `reference_day`.
fn blocking_quiet_week(
    db: &LedgerDb,
    user_id: &str,
    reference_day: DayKey,
    rules: &RulesConfig,
) -> Result<Option<DayKey>> {
    let ws = week_start(reference_day);
    let cooldown = i64::from(rules.quiet_cooldown_days);
    db.latest_quiet_week_between(user_id, add_days(ws, -cooldown)?, ws)
}

/// Whether the week containing `reference_day` may be made quiet.
pub fn can_enable_quiet_week(
    db: &LedgerDb,
    user_id: &str,
    reference_day: DayKey,
    rules: &RulesConfig,
) -> Result<bool> {
    Ok(blocking_quiet_week(db, user_id, reference_day, rules)?.is_none())
}

/// Mark the week containing `reference_day` quiet, returning the existing row
/// when it already is.
///
/// Does not consult the cooldown; see [`enable_quiet_week_checked`].
pub fn enable_quiet_week(
    db: &LedgerDb,
    user_id: &str,
    reference_day: DayKey,
    now: NaiveDateTime,
) -> Result<QuietWeek> {
    let ws = week_start(reference_day);
    db.with_transaction(|db| {
        let week = QuietWeek {
            user_id: user_id.to_string(),
            week_start: ws,
            created_at: now,
        };
        if db.insert_quiet_week(&week)? {
            info!(user = user_id, week_start = %ws, "quiet week enabled");
        }
        db.quiet_week(user_id, ws)?
            .ok_or_else(|| CoreError::not_found("QuietWeek", ws.to_string()))
    })
}

/// Gate then enable.
///
/// # Errors
/// `CooldownActive` when another quiet week started within the cooldown.
pub fn enable_quiet_week_checked(
    db: &LedgerDb,
    user_id: &str,
    reference_day: DayKey,
    now: NaiveDateTime,
    rules: &RulesConfig,
) -> Result<QuietWeek> {
    let ws = week_start(reference_day);
    db.with_transaction(|db| {
        if let Some(existing) = db.quiet_week(user_id, ws)? {
            return Ok(existing);
        }
        if let Some(latest) = blocking_quiet_week(db, user_id, reference_day, rules)? {
            return Err(CoreError::CooldownActive {
                week_start: ws,
                available_from: add_days(latest, i64::from(rules.quiet_cooldown_days))?,
            });
        }
        enable_quiet_week(db, user_id, reference_day, now)
    })
}

/// The quiet week covering `day`, if any.
pub fn quiet_week_for(db: &LedgerDb, user_id: &str, day: DayKey) -> Result<Option<QuietWeek>> {
    db.quiet_week(user_id, week_start(day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // Sunday
    fn week(n: i64) -> DayKey {
        add_days(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), 7 * n).unwrap()
    }

    fn at(day: DayKey) -> NaiveDateTime {
        day.and_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn cooldown_blocks_next_week_but_not_the_one_after() {
        let db = LedgerDb::open_memory().unwrap();
        let rules = RulesConfig::default();
        // Enable from a Wednesday; the row is keyed by the week's Sunday
        let wednesday = add_days(week(0), 3).unwrap();
        let enabled = enable_quiet_week_checked(&db, "u1", wednesday, at(wednesday), &rules).unwrap();
        assert_eq!(enabled.week_start, week(0));

        assert!(!can_enable_quiet_week(&db, "u1", week(1), &rules).unwrap());
        match enable_quiet_week_checked(&db, "u1", week(1), at(week(1)), &rules).unwrap_err() {
            CoreError::CooldownActive {
                week_start,
                available_from,
            } => {
                assert_eq!(week_start, week(1));
                assert_eq!(available_from, week(2));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(can_enable_quiet_week(&db, "u1", week(2), &rules).unwrap());
        assert!(enable_quiet_week_checked(&db, "u1", week(2), at(week(2)), &rules).is_ok());
    }

    #[test]
    fn enabling_same_week_is_idempotent() {
        let db = LedgerDb::open_memory().unwrap();
        let rules = RulesConfig::default();
        let first = enable_quiet_week_checked(&db, "u1", week(0), at(week(0)), &rules).unwrap();
        let later = add_days(week(0), 5).unwrap();
        let again = enable_quiet_week_checked(&db, "u1", later, at(later), &rules).unwrap();
        assert_eq!(first, again);
        assert_eq!(quiet_week_for(&db, "u1", later).unwrap(), Some(first));
    }

    #[test]
    fn future_quiet_week_does_not_block_earlier_week() {
        let db = LedgerDb::open_memory().unwrap();
        let rules = RulesConfig::default();
        enable_quiet_week(&db, "u1", week(3), at(week(0))).unwrap();
        assert!(can_enable_quiet_week(&db, "u1", week(2), &rules).unwrap());
    }

    #[test]
    fn users_are_independent() {
        let db = LedgerDb::open_memory().unwrap();
        let rules = RulesConfig::default();
        enable_quiet_week(&db, "u1", week(0), at(week(0))).unwrap();
        assert!(can_enable_quiet_week(&db, "u2", week(1), &rules).unwrap());
        assert!(quiet_week_for(&db, "u2", week(0)).unwrap().is_none());
    }
}
