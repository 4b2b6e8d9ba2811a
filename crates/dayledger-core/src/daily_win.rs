//! Daily win evaluator.
//!
//! A daily win is the one condition that salvages a day when the full
//! completion rule is out of reach. Once a day's win is recorded it is never
//! re-evaluated.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::storage::{DailyWinSettings, LedgerDb};
use crate::time::DayKey;

/// What counts as the daily win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DailyWinConfig {
    /// Any output or artifact recorded for the day
    Output,
    /// Completing one pinned block
    Block { block_id: String },
    /// Either of the above
    Either { block_id: String },
}

impl DailyWinConfig {
    pub fn type_name(&self) -> &'static str {
        match self {
            DailyWinConfig::Output => "output",
            DailyWinConfig::Block { .. } => "block",
            DailyWinConfig::Either { .. } => "either",
        }
    }

    pub fn pinned_block(&self) -> Option<&str> {
        match self {
            DailyWinConfig::Output => None,
            DailyWinConfig::Block { block_id } | DailyWinConfig::Either { block_id } => {
                Some(block_id)
            }
        }
    }

    pub fn accepts_output(&self) -> bool {
        !matches!(self, DailyWinConfig::Block { .. })
    }

    /// Build a config from user input.
    ///
    /// # Errors
    /// `InvalidValue` for an unknown type, or `block`/`either` without a block.
    pub fn from_input(win_type: &str, block_id: Option<String>) -> Result<Self, ValidationError> {
        Self::from_parts(win_type.trim(), block_id).ok_or_else(|| ValidationError::InvalidValue {
            field: "daily_win",
            message: format!("expected output, block <id> or either <id>, got '{win_type}'"),
        })
    }

    /// Rebuild a config from its stored `(type, block_id)` pair.
    fn from_parts(win_type: &str, block_id: Option<String>) -> Option<Self> {
        match (win_type, block_id) {
            ("output", _) => Some(DailyWinConfig::Output),
            ("block", Some(block_id)) => Some(DailyWinConfig::Block { block_id }),
            ("either", Some(block_id)) => Some(DailyWinConfig::Either { block_id }),
            _ => None,
        }
    }
}

/// The evidence that satisfied a day's win.
///
/// Stored and serialized as `"output"` or `"block:<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SatisfiedBy {
    Output,
    Block(String),
}

impl fmt::Display for SatisfiedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SatisfiedBy::Output => f.write_str("output"),
            SatisfiedBy::Block(id) => write!(f, "block:{id}"),
        }
    }
}

impl FromStr for SatisfiedBy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "output" => Ok(SatisfiedBy::Output),
            Some(("block", id)) if !id.is_empty() => Ok(SatisfiedBy::Block(id.to_string())),
            _ => Err(ValidationError::InvalidValue {
                field: "satisfied_by",
                message: format!("expected 'output' or 'block:<id>', got '{s}'"),
            }),
        }
    }
}

impl From<SatisfiedBy> for String {
    fn from(value: SatisfiedBy) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for SatisfiedBy {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWin {
    pub user_id: String,
    pub day: DayKey,
    pub satisfied_by: SatisfiedBy,
    pub satisfied_at: NaiveDateTime,
    /// Active goal when the win was first recorded
    pub goal_id: Option<String>,
}

/// Whether `evidence` meets `config`.
pub fn evidence_satisfies(config: &DailyWinConfig, evidence: &SatisfiedBy) -> bool {
    match evidence {
        SatisfiedBy::Output => config.accepts_output(),
        SatisfiedBy::Block(id) => config.pinned_block() == Some(id.as_str()),
    }
}

/// Config used when the user never chose one: pin the first mandatory block in
/// the primary category, or fall back to output.
pub fn default_config(
    db: &LedgerDb,
    user_id: &str,
    settings: &DailyWinSettings,
) -> Result<DailyWinConfig> {
    let pinned = db
        .mandatory_blocks(user_id)?
        .into_iter()
        .find(|b| b.category == settings.primary_category);
    Ok(match pinned {
        Some(block) => DailyWinConfig::Either { block_id: block.id },
        None => DailyWinConfig::Output,
    })
}

/// The stored config, or the default heuristic when none was saved.
pub fn get_daily_win_config(
    db: &LedgerDb,
    user_id: &str,
    settings: &DailyWinSettings,
) -> Result<DailyWinConfig> {
    let stored = db.daily_win_settings(user_id)?;
    match stored {
        Some((Some(win_type), block_id)) => DailyWinConfig::from_parts(&win_type, block_id)
            .ok_or_else(|| {
                CoreError::from(DatabaseError::CorruptValue {
                    column: "daily_win_type",
                    value: win_type,
                })
            }),
        _ => default_config(db, user_id, settings),
    }
}

/// Persist the user's config. A pinned block must belong to the user.
pub fn set_daily_win_config(db: &LedgerDb, user_id: &str, config: &DailyWinConfig) -> Result<()> {
    if let Some(block_id) = config.pinned_block() {
        if db.block(user_id, block_id)?.is_none() {
            return Err(CoreError::not_found("ScheduleBlock", block_id));
        }
    }
    db.set_daily_win_settings(user_id, config.type_name(), config.pinned_block())
}

/// Evaluate the day's win without recording anything.
pub fn is_daily_win_satisfied(
    db: &LedgerDb,
    user_id: &str,
    day: DayKey,
    config: &DailyWinConfig,
) -> Result<bool> {
    if db.daily_win(user_id, day)?.is_some() {
        return Ok(true);
    }

    if config.accepts_output() && has_output_evidence(db, user_id, day)? {
        return Ok(true);
    }
    if let Some(block_id) = config.pinned_block() {
        if db.is_block_completed(user_id, block_id, day)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn has_output_evidence(db: &LedgerDb, user_id: &str, day: DayKey) -> Result<bool> {
    if let Some(goal_id) = db.active_goal(user_id)? {
        if db.has_artifact(user_id, &goal_id, day)? {
            return Ok(true);
        }
    }
    Ok(db
        .daily_completion(user_id, day)?
        .is_some_and(|c| c.has_output_content()))
}

/// Record the day's win. Safe to call repeatedly; a recorded day stays won.
pub fn upsert_daily_win(
    db: &LedgerDb,
    user_id: &str,
    day: DayKey,
    satisfied_by: SatisfiedBy,
    now: NaiveDateTime,
) -> Result<DailyWin> {
    db.with_transaction(|db| {
        let first = db.daily_win(user_id, day)?.is_none();
        let goal_id = db.active_goal(user_id)?;
        let win = DailyWin {
            user_id: user_id.to_string(),
            day,
            satisfied_by,
            satisfied_at: now,
            goal_id,
        };
        db.upsert_daily_win(&win)?;
        if first {
            info!(user = user_id, %day, satisfied_by = %win.satisfied_by, "daily win recorded");
        }
        db.daily_win(user_id, day)?
            .ok_or_else(|| CoreError::not_found("DailyWin", day.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputType;
    use crate::schedule::{BlockCategory, NewBlock};
    use chrono::NaiveDate;

    fn day() -> DayKey {
        NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
    }

    fn now() -> NaiveDateTime {
        day().and_hms_opt(12, 0, 0).unwrap()
    }

    fn add_block(db: &LedgerDb, name: &str, start: u32, category: BlockCategory) -> String {
        db.insert_block(
            "u1",
            &NewBlock {
                name: name.into(),
                start_minute: start,
                end_minute: start + 60,
                category,
                mandatory: true,
            },
            now(),
        )
        .unwrap()
        .id
    }

    #[test]
    fn satisfied_by_wire_format() {
        assert_eq!(SatisfiedBy::Output.to_string(), "output");
        assert_eq!(SatisfiedBy::Block("b1".into()).to_string(), "block:b1");
        assert_eq!("block:b1".parse::<SatisfiedBy>().unwrap(), SatisfiedBy::Block("b1".into()));
        assert!("block:".parse::<SatisfiedBy>().is_err());
        assert_eq!(serde_json::to_string(&SatisfiedBy::Output).unwrap(), "\"output\"");
    }

    #[test]
    fn config_serializes_as_tagged_union() {
        let config = DailyWinConfig::Either {
            block_id: "b1".into(),
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json, serde_json::json!({"type": "either", "block_id": "b1"}));
    }

    #[test]
    fn block_configs_need_a_block() {
        assert_eq!(DailyWinConfig::from_input("output", None).unwrap(), DailyWinConfig::Output);
        assert_eq!(
            DailyWinConfig::from_input(" block ", Some("b1".into())).unwrap(),
            DailyWinConfig::Block { block_id: "b1".into() }
        );
        assert!(DailyWinConfig::from_input("either", None).is_err());
        assert!(DailyWinConfig::from_input("streak", None).is_err());
    }

    #[test]
    fn default_pins_primary_category_block() {
        let db = LedgerDb::open_memory().unwrap();
        let settings = DailyWinSettings::default();
        assert_eq!(default_config(&db, "u1", &settings).unwrap(), DailyWinConfig::Output);

        add_block(&db, "Gym", 360, BlockCategory::Health);
        let core = add_block(&db, "Deep work", 540, BlockCategory::CoreWork);
        assert_eq!(
            get_daily_win_config(&db, "u1", &settings).unwrap(),
            DailyWinConfig::Either { block_id: core }
        );
    }

    #[test]
    fn stored_config_wins_over_default() {
        let db = LedgerDb::open_memory().unwrap();
        let gym = add_block(&db, "Gym", 360, BlockCategory::Health);
        let config = DailyWinConfig::Block { block_id: gym };
        set_daily_win_config(&db, "u1", &config).unwrap();
        assert_eq!(
            get_daily_win_config(&db, "u1", &DailyWinSettings::default()).unwrap(),
            config
        );
    }

    #[test]
    fn pinning_unknown_block_is_not_found() {
        let db = LedgerDb::open_memory().unwrap();
        let err = set_daily_win_config(
            &db,
            "u1",
            &DailyWinConfig::Block {
                block_id: "missing".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn either_accepts_output_or_block() {
        let db = LedgerDb::open_memory().unwrap();
        let core = add_block(&db, "Deep work", 540, BlockCategory::CoreWork);
        let config = DailyWinConfig::Either {
            block_id: core.clone(),
        };
        assert!(!is_daily_win_satisfied(&db, "u1", day(), &config).unwrap());

        db.insert_block_completion("u1", &core, day(), now()).unwrap();
        assert!(is_daily_win_satisfied(&db, "u1", day(), &config).unwrap());

        let next = day().succ_opt().unwrap();
        db.set_output("u1", next, OutputType::Text, "Wrote the summary").unwrap();
        assert!(is_daily_win_satisfied(&db, "u1", next, &config).unwrap());
        // Evaluation alone never writes a row
        assert!(db.daily_win("u1", next).unwrap().is_none());
    }

    #[test]
    fn artifact_for_active_goal_counts_as_output() {
        let db = LedgerDb::open_memory().unwrap();
        db.set_active_goal("u1", Some("g1")).unwrap();
        db.insert_artifact("u1", "g1", day(), OutputType::Url, "https://github.com/a/b", now())
            .unwrap();
        assert!(is_daily_win_satisfied(&db, "u1", day(), &DailyWinConfig::Output).unwrap());
    }

    #[test]
    fn block_config_ignores_output() {
        let db = LedgerDb::open_memory().unwrap();
        let core = add_block(&db, "Deep work", 540, BlockCategory::CoreWork);
        db.set_output("u1", day(), OutputType::Text, "Wrote the summary").unwrap();
        let config = DailyWinConfig::Block { block_id: core };
        assert!(!is_daily_win_satisfied(&db, "u1", day(), &config).unwrap());
        assert!(!evidence_satisfies(&config, &SatisfiedBy::Output));
    }

    #[test]
    fn recorded_win_is_sticky() {
        let db = LedgerDb::open_memory().unwrap();
        db.set_active_goal("u1", Some("g1")).unwrap();
        let first = upsert_daily_win(&db, "u1", day(), SatisfiedBy::Output, now()).unwrap();
        assert_eq!(first.goal_id.as_deref(), Some("g1"));

        db.set_active_goal("u1", Some("g2")).unwrap();
        let later = day().and_hms_opt(18, 0, 0).unwrap();
        let second =
            upsert_daily_win(&db, "u1", day(), SatisfiedBy::Block("b1".into()), later).unwrap();
        assert_eq!(second.satisfied_by, SatisfiedBy::Block("b1".into()));
        assert_eq!(second.satisfied_at, later);
        assert_eq!(second.goal_id.as_deref(), Some("g1"));

        let config = DailyWinConfig::Block {
            block_id: "other".into(),
        };
        assert!(is_daily_win_satisfied(&db, "u1", day(), &config).unwrap());
    }
}
