//! Commitment records owned by the planning subsystem.
//!
//! The engine only reads these. The minimal constructors and validation here
//! exist so collaborators (and tests) can seed a store with well-formed data.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::{is_overlapping, DayKey, MINUTES_PER_DAY};

/// Longest plan cycle accepted, roughly ten years.
pub const MAX_PLAN_DAYS: u32 = 3650;

/// Category of a schedule block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockCategory {
    CoreWork,
    SupportWork,
    Learning,
    Practice,
    Health,
    Reflection,
    Recovery,
}

impl BlockCategory {
    pub const ALL: [BlockCategory; 7] = [
        BlockCategory::CoreWork,
        BlockCategory::SupportWork,
        BlockCategory::Learning,
        BlockCategory::Practice,
        BlockCategory::Health,
        BlockCategory::Reflection,
        BlockCategory::Recovery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockCategory::CoreWork => "CoreWork",
            BlockCategory::SupportWork => "SupportWork",
            BlockCategory::Learning => "Learning",
            BlockCategory::Practice => "Practice",
            BlockCategory::Health => "Health",
            BlockCategory::Reflection => "Reflection",
            BlockCategory::Recovery => "Recovery",
        }
    }
}

impl fmt::Display for BlockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "category",
                message: format!("unknown block category '{s}'"),
            })
    }
}

/// A recurring daily commitment in the user's timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub start_minute: u32,
    pub end_minute: u32,
    pub category: BlockCategory,
    pub mandatory: bool,
}

impl ScheduleBlock {
    /// Hour of day the block starts in (0..=23).
    pub fn start_hour(&self) -> u32 {
        self.start_minute / 60
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end_minute - self.start_minute
    }
}

/// Input for a new schedule block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlock {
    pub name: String,
    pub start_minute: u32,
    pub end_minute: u32,
    pub category: BlockCategory,
    pub mandatory: bool,
}

impl NewBlock {
    /// Check shape and overlap against the user's existing blocks.
    pub fn validate(&self, existing: &[ScheduleBlock]) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.start_minute >= self.end_minute || self.end_minute > MINUTES_PER_DAY {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start_minute,
                end: self.end_minute,
            });
        }
        let candidate = (self.start_minute, self.end_minute);
        if let Some(hit) = existing
            .iter()
            .find(|b| is_overlapping(candidate, (b.start_minute, b.end_minute)))
        {
            return Err(ValidationError::Overlap(hit.name.clone()));
        }
        Ok(())
    }
}

/// A time-boxed plan cycle; its tasks are dated within `[start_day, start_day + duration_days)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub start_day: DayKey,
    pub duration_days: u32,
}

impl Plan {
    pub fn validate_duration(duration_days: u32) -> Result<(), ValidationError> {
        if !(1..=MAX_PLAN_DAYS).contains(&duration_days) {
            return Err(ValidationError::InvalidValue {
                field: "duration_days",
                message: format!("must be between 1 and {MAX_PLAN_DAYS}, got {duration_days}"),
            });
        }
        Ok(())
    }

    /// First day after the cycle, saturating at the end of the calendar.
    pub fn end_day(&self) -> DayKey {
        self.start_day
            .checked_add_days(Days::new(u64::from(self.duration_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn covers(&self, day: DayKey) -> bool {
        day >= self.start_day && day < self.end_day()
    }
}

/// A dated plan task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTask {
    pub id: String,
    pub plan_id: String,
    pub user_id: String,
    pub day: DayKey,
    pub title: String,
    pub category: Option<String>,
    pub mandatory: bool,
    pub completed_at: Option<NaiveDateTime>,
}

impl PlanTask {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Input for a new plan task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub day: DayKey,
    pub title: String,
    pub category: Option<String>,
    pub mandatory: bool,
}
