//! Per-day history series: completion status with task counts, and how
//! consistently each category of mandatory blocks gets done.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schedule::BlockCategory;
use crate::storage::{AnalyticsConfig, LedgerDb};
use crate::time::{add_days, day_range, DayKey};

pub const DEFAULT_COMPLETION_STATS_DAYS: u32 = 30;
pub const DEFAULT_CONSISTENCY_DAYS: u32 = 14;

/// Characters of output evidence kept in a day's summary
const OUTPUT_SUMMARY_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCompletionStatus {
    Complete,
    Incomplete,
}

/// One day of the completion series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCompletionStat {
    pub day: DayKey,
    /// `complete` once the day's completion marker was ever set
    pub status: DayCompletionStatus,
    pub mandatory_completed_count: u32,
    pub mandatory_total_count: u32,
    /// Latest goal artifact for the day, else the day's output, cut to 120 characters
    pub output_summary: String,
}

/// Mandatory block completion ratio per category for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConsistencyDay {
    pub day: DayKey,
    /// Category name to completed / total mandatory blocks, in `0.0..=1.0`
    pub by_category: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConsistency {
    /// Categories that have at least one mandatory block
    pub categories: Vec<BlockCategory>,
    pub days: Vec<CategoryConsistencyDay>,
}

fn summarize(content: &str) -> String {
    content.chars().take(OUTPUT_SUMMARY_CHARS).collect()
}

/// `[start, end)` covering the `window_days` days ending `today`.
fn trailing_window(today: DayKey, window_days: u32) -> Result<(DayKey, DayKey)> {
    Ok((add_days(today, 1 - i64::from(window_days))?, add_days(today, 1)?))
}

/// Completion status, mandatory task counts and an output excerpt for each
/// of the trailing days ending `today`, oldest first.
///
/// The window defaults to 30 days and is clamped like every analytics window.
pub fn daily_completion_stats(
    db: &LedgerDb,
    user_id: &str,
    today: DayKey,
    window_days: Option<u32>,
    analytics: &AnalyticsConfig,
) -> Result<Vec<DailyCompletionStat>> {
    let window = analytics.clamp_window(window_days.unwrap_or(DEFAULT_COMPLETION_STATS_DAYS));
    let (start, end) = trailing_window(today, window)?;

    db.with_transaction(|db| {
        let mut tasks: HashMap<DayKey, (u32, u32)> = HashMap::new();
        for task in db.tasks_between(user_id, start, end)?.iter().filter(|t| t.mandatory) {
            let entry = tasks.entry(task.day).or_default();
            entry.1 += 1;
            if task.is_completed() {
                entry.0 += 1;
            }
        }

        let completions: HashMap<DayKey, _> = db
            .daily_completions_between(user_id, start, end)?
            .into_iter()
            .map(|c| (c.day, c))
            .collect();

        // Newest first, so the first artifact seen for a day is its latest
        let goal = db.active_goal(user_id)?;
        let mut artifacts: HashMap<DayKey, String> = HashMap::new();
        for artifact in db.artifacts_between(user_id, goal.as_deref(), start, end)? {
            artifacts.entry(artifact.day).or_insert(artifact.content);
        }

        Ok(day_range(start, window)
            .map(|day| {
                let completion = completions.get(&day);
                let (completed, total) = tasks.get(&day).copied().unwrap_or_default();
                let output = artifacts
                    .get(&day)
                    .map(String::as_str)
                    .or_else(|| completion.and_then(|c| c.output_content.as_deref()))
                    .unwrap_or_default();
                let status = if completion.is_some_and(|c| c.completed_at.is_some()) {
                    DayCompletionStatus::Complete
                } else {
                    DayCompletionStatus::Incomplete
                };
                DailyCompletionStat {
                    day,
                    status,
                    mandatory_completed_count: completed,
                    mandatory_total_count: total,
                    output_summary: summarize(output),
                }
            })
            .collect())
    })
}

/// Share of each category's mandatory blocks completed on each trailing day
/// ending `today`, oldest first. The window defaults to 14 days.
pub fn block_consistency(
    db: &LedgerDb,
    user_id: &str,
    today: DayKey,
    window_days: Option<u32>,
    analytics: &AnalyticsConfig,
) -> Result<BlockConsistency> {
    let window = analytics.clamp_window(window_days.unwrap_or(DEFAULT_CONSISTENCY_DAYS));
    let (start, end) = trailing_window(today, window)?;

    db.with_transaction(|db| {
        let blocks = db.mandatory_blocks(user_id)?;
        let completed = db.block_completions_between(user_id, start, end)?;
        let categories: BTreeSet<BlockCategory> = blocks.iter().map(|b| b.category).collect();

        let days = day_range(start, window)
            .map(|day| {
                let by_category = categories
                    .iter()
                    .map(|&category| {
                        let in_category: Vec<_> =
                            blocks.iter().filter(|b| b.category == category).collect();
                        let done = in_category
                            .iter()
                            .filter(|b| completed.contains(&(b.id.clone(), day)))
                            .count();
                        let ratio = done as f64 / in_category.len() as f64;
                        (category.as_str().to_string(), ratio)
                    })
                    .collect();
                CategoryConsistencyDay { day, by_category }
            })
            .collect();

        Ok(BlockConsistency {
            categories: categories.into_iter().collect(),
            days,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputType;
    use crate::schedule::{NewBlock, NewTask};
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> DayKey {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn block(db: &LedgerDb, name: &str, start: u32, category: BlockCategory) -> String {
        db.insert_block(
            "u1",
            &NewBlock {
                name: name.into(),
                start_minute: start,
                end_minute: start + 60,
                category,
                mandatory: true,
            },
            at(1, 6),
        )
        .unwrap()
        .id
    }

    fn task(db: &LedgerDb, plan_id: &str, d: u32, mandatory: bool) -> String {
        db.insert_task(
            "u1",
            plan_id,
            &NewTask {
                day: day(d),
                title: "Draft chapter".into(),
                category: None,
                mandatory,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn series_counts_tasks_and_prefers_artifacts() {
        let db = LedgerDb::open_memory().unwrap();
        let plan = db.create_plan("u1", "Sprint", day(1), 30).unwrap();
        let done = task(&db, &plan.id, 9, true);
        task(&db, &plan.id, 9, true);
        // Optional tasks stay out of the mandatory counts
        task(&db, &plan.id, 9, false);
        db.set_task_completed_at("u1", &done, Some(at(9, 11))).unwrap();

        let long_output = "x".repeat(200);
        db.set_output("u1", day(8), OutputType::Text, &long_output).unwrap();
        db.upsert_day_flags(
            "u1",
            day(8),
            &crate::DayStatus {
                mandatory_blocks_done: true,
                mandatory_tasks_done: true,
                output_ready: true,
                is_complete: true,
                has_debt: false,
                is_failure_day: false,
            },
            Some(at(8, 20)),
        )
        .unwrap();
        db.set_output("u1", day(9), OutputType::Text, "Daily notes on the parser").unwrap();
        db.set_active_goal("u1", Some("book")).unwrap();
        db.insert_artifact("u1", "book", day(9), OutputType::Text, "First pass", at(9, 12))
            .unwrap();
        db.insert_artifact("u1", "book", day(9), OutputType::Text, "Second pass", at(9, 18))
            .unwrap();
        db.insert_artifact("u1", "other", day(10), OutputType::Text, "Side project", at(10, 9))
            .unwrap();

        let stats =
            daily_completion_stats(&db, "u1", day(10), Some(3), &AnalyticsConfig::default()).unwrap();
        let days: Vec<_> = stats.iter().map(|s| s.day).collect();
        assert_eq!(days, vec![day(8), day(9), day(10)]);

        assert_eq!(stats[0].status, DayCompletionStatus::Complete);
        assert_eq!(stats[0].output_summary.chars().count(), 120);

        assert_eq!(stats[1].status, DayCompletionStatus::Incomplete);
        assert_eq!((stats[1].mandatory_completed_count, stats[1].mandatory_total_count), (1, 2));
        assert_eq!(stats[1].output_summary, "Second pass");

        // Artifacts for goals other than the active one are ignored
        assert_eq!(stats[2].output_summary, "");
        assert_eq!(stats[2].mandatory_total_count, 0);
    }

    #[test]
    fn series_defaults_to_thirty_days() {
        let db = LedgerDb::open_memory().unwrap();
        let stats =
            daily_completion_stats(&db, "u1", day(31), None, &AnalyticsConfig::default()).unwrap();
        assert_eq!(stats.len(), 30);
        assert_eq!(stats.first().map(|s| s.day), Some(day(2)));
        assert!(stats.iter().all(|s| s.status == DayCompletionStatus::Incomplete));
    }

    #[test]
    fn consistency_is_a_ratio_per_category() {
        let db = LedgerDb::open_memory().unwrap();
        let gym = block(&db, "Gym", 360, BlockCategory::Health);
        let write = block(&db, "Write", 540, BlockCategory::CoreWork);
        block(&db, "Edit", 660, BlockCategory::CoreWork);
        db.insert_block_completion("u1", &gym, day(9), at(9, 7)).unwrap();
        db.insert_block_completion("u1", &write, day(9), at(9, 10)).unwrap();
        db.insert_block_completion("u1", &write, day(10), at(10, 10)).unwrap();

        let consistency =
            block_consistency(&db, "u1", day(10), Some(2), &AnalyticsConfig::default()).unwrap();
        assert_eq!(consistency.categories, vec![BlockCategory::CoreWork, BlockCategory::Health]);
        assert_eq!(consistency.days.len(), 2);

        let ninth = &consistency.days[0].by_category;
        assert_eq!(ninth.get("CoreWork"), Some(&0.5));
        assert_eq!(ninth.get("Health"), Some(&1.0));
        let tenth = &consistency.days[1].by_category;
        assert_eq!(tenth.get("CoreWork"), Some(&0.5));
        assert_eq!(tenth.get("Health"), Some(&0.0));
    }

    #[test]
    fn consistency_without_mandatory_blocks_is_empty() {
        let db = LedgerDb::open_memory().unwrap();
        let consistency =
            block_consistency(&db, "u1", day(14), None, &AnalyticsConfig::default()).unwrap();
        assert!(consistency.categories.is_empty());
        assert_eq!(consistency.days.len(), 14);
        assert!(consistency.days.iter().all(|d| d.by_category.is_empty()));
    }
}
