//! Weekly insights aggregator.
//!
//! Tallies missed mandatory blocks for one Sunday-aligned week by category and
//! by start hour, and classifies the week against the one before it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ValidationError};
use crate::storage::LedgerDb;
use crate::time::{add_days, day_range, week_start, DayKey};

/// Week-over-week movement in completed days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn between(previous: u32, current: u32) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Trend::Improving,
            std::cmp::Ordering::Less => Trend::Declining,
            std::cmp::Ordering::Equal => Trend::Stable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trend {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "improving" => Ok(Trend::Improving),
            "declining" => Ok(Trend::Declining),
            "stable" => Ok(Trend::Stable),
            other => Err(ValidationError::InvalidValue {
                field: "trend",
                message: format!("unknown trend '{other}'"),
            }),
        }
    }
}

/// Missed-commitment rollup for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyInsights {
    /// Sunday the week starts on
    pub week_start: DayKey,
    /// Missed mandatory blocks per category name
    pub missed_by_category: BTreeMap<String, u32>,
    /// Missed mandatory blocks per start hour (0-23)
    pub missed_by_hour: BTreeMap<u32, u32>,
    /// Hour with the most misses; the lowest hour wins a tie
    pub most_skipped_hour: Option<u32>,
    pub trend: Trend,
}

impl WeeklyInsights {
    pub fn total_missed(&self) -> u32 {
        self.missed_by_category.values().sum()
    }
}

fn most_skipped_hour(missed_by_hour: &BTreeMap<u32, u32>) -> Option<u32> {
    // Ascending iteration plus strict comparison keeps the lowest hour on ties
    let mut best: Option<(u32, u32)> = None;
    for (&hour, &count) in missed_by_hour {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((hour, count));
        }
    }
    best.map(|(hour, _)| hour)
}

/// Compute insights for the week containing `day`.
pub fn compute_weekly_insights(db: &LedgerDb, user_id: &str, day: DayKey) -> Result<WeeklyInsights> {
    let ws = week_start(day);
    let we = add_days(ws, 7)?;

    db.with_transaction(|db| {
        let blocks = db.mandatory_blocks(user_id)?;
        let completed = db.block_completions_between(user_id, ws, we)?;

        let mut missed_by_category: BTreeMap<String, u32> = BTreeMap::new();
        let mut missed_by_hour: BTreeMap<u32, u32> = BTreeMap::new();
        for d in day_range(ws, 7) {
            for block in &blocks {
                if completed.contains(&(block.id.clone(), d)) {
                    continue;
                }
                *missed_by_category
                    .entry(block.category.as_str().to_string())
                    .or_insert(0) += 1;
                *missed_by_hour.entry(block.start_hour()).or_insert(0) += 1;
            }
        }

        let this_week = db.count_completed_between(user_id, ws, we)?;
        let last_week = db.count_completed_between(user_id, add_days(ws, -7)?, ws)?;

        Ok(WeeklyInsights {
            week_start: ws,
            most_skipped_hour: most_skipped_hour(&missed_by_hour),
            missed_by_category,
            missed_by_hour,
            trend: Trend::between(last_week, this_week),
        })
    })
}

/// Compute and persist the week's snapshot.
pub fn refresh_weekly_insights(
    db: &LedgerDb,
    user_id: &str,
    day: DayKey,
    now: NaiveDateTime,
) -> Result<WeeklyInsights> {
    let insights = compute_weekly_insights(db, user_id, day)?;
    db.upsert_weekly_insights(user_id, &insights, now)?;
    info!(
        user = user_id,
        week_start = %insights.week_start,
        missed = insights.total_missed(),
        trend = %insights.trend,
        "weekly insights saved"
    );
    Ok(insights)
}

/// The last persisted snapshot for the week containing `day`.
pub fn stored_weekly_insights(
    db: &LedgerDb,
    user_id: &str,
    day: DayKey,
) -> Result<Option<WeeklyInsights>> {
    db.weekly_insights_snapshot(user_id, week_start(day))
}
