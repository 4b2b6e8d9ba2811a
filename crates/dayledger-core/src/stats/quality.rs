//! Depth of goal artifacts over recent weeks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::output::OutputType;
use crate::storage::{AnalyticsConfig, LedgerDb};
use crate::time::{add_days, week_start, DayKey};

pub const DEFAULT_QUALITY_WEEKS: u32 = 8;
const TIMELINE_LIMIT: usize = 20;
const STANDARD_MIN_CHARS: usize = 120;
const DEEP_MIN_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDepth {
    Shallow,
    Standard,
    Deep,
}

/// Links and files count as standard; text is graded by length.
pub fn classify_depth(kind: OutputType, content: &str) -> OutputDepth {
    if content.trim().is_empty() {
        return OutputDepth::Shallow;
    }
    if matches!(kind, OutputType::Url | OutputType::File) {
        return OutputDepth::Standard;
    }
    match content.chars().count() {
        n if n >= DEEP_MIN_CHARS => OutputDepth::Deep,
        n if n >= STANDARD_MIN_CHARS => OutputDepth::Standard,
        _ => OutputDepth::Shallow,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyDepth {
    pub week_start: DayKey,
    pub shallow: u32,
    pub standard: u32,
    pub deep: u32,
}

impl WeeklyDepth {
    fn empty(week_start: DayKey) -> Self {
        Self {
            week_start,
            shallow: 0,
            standard: 0,
            deep: 0,
        }
    }

    fn count(&mut self, depth: OutputDepth) {
        match depth {
            OutputDepth::Shallow => self.shallow += 1,
            OutputDepth::Standard => self.standard += 1,
            OutputDepth::Deep => self.deep += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTimelineEntry {
    pub day: DayKey,
    pub output_type: OutputType,
    pub content: String,
    pub depth: OutputDepth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputQualityStats {
    /// Oldest week first, ending with the week containing today
    pub weeks: Vec<WeeklyDepth>,
    /// Most recent artifacts, newest first
    pub timeline: Vec<OutputTimelineEntry>,
}

/// Grade the active goal's artifacts (every goal when none is active) for
/// the last `weeks` Sunday-based weeks up to and including today.
pub fn output_quality_stats(
    db: &LedgerDb,
    user_id: &str,
    today: DayKey,
    weeks: Option<u32>,
    analytics: &AnalyticsConfig,
) -> Result<OutputQualityStats> {
    let weeks = analytics.clamp_weeks(weeks.unwrap_or(DEFAULT_QUALITY_WEEKS));
    let current = week_start(today);
    let first = add_days(current, -7 * (i64::from(weeks) - 1))?;
    let end = add_days(today, 1)?;

    let artifacts = db.with_transaction(|db| {
        let goal = db.active_goal(user_id)?;
        db.artifacts_between(user_id, goal.as_deref(), first, end)
    })?;

    let mut by_week: HashMap<DayKey, WeeklyDepth> = HashMap::new();
    let mut timeline = Vec::new();
    for artifact in artifacts {
        let depth = classify_depth(artifact.kind, &artifact.content);
        let ws = week_start(artifact.day);
        by_week.entry(ws).or_insert_with(|| WeeklyDepth::empty(ws)).count(depth);
        if timeline.len() < TIMELINE_LIMIT {
            timeline.push(OutputTimelineEntry {
                day: artifact.day,
                output_type: artifact.kind,
                content: artifact.content,
                depth,
            });
        }
    }

    let mut weekly = Vec::with_capacity(weeks as usize);
    for offset in 0..i64::from(weeks) {
        let ws = add_days(first, 7 * offset)?;
        weekly.push(by_week.remove(&ws).unwrap_or_else(|| WeeklyDepth::empty(ws)));
    }

    Ok(OutputQualityStats {
        weeks: weekly,
        timeline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> DayKey {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn depth_grades_text_by_length() {
        assert_eq!(classify_depth(OutputType::Text, ""), OutputDepth::Shallow);
        assert_eq!(classify_depth(OutputType::Text, "Short note"), OutputDepth::Shallow);
        assert_eq!(classify_depth(OutputType::Text, &"a".repeat(120)), OutputDepth::Standard);
        assert_eq!(classify_depth(OutputType::Text, &"a".repeat(300)), OutputDepth::Deep);
        assert_eq!(
            classify_depth(OutputType::Url, "https://blog.dev/post"),
            OutputDepth::Standard
        );
        assert_eq!(classify_depth(OutputType::File, "notes.pdf"), OutputDepth::Standard);
    }

    #[test]
    fn weeks_end_with_the_current_week() {
        let db = LedgerDb::open_memory().unwrap();
        db.set_active_goal("u1", Some("book")).unwrap();
        // 2026-03-11 is a Wednesday; weeks start 03-01 and 03-08
        let essay = "a".repeat(320);
        db.insert_artifact("u1", "book", day(2), OutputType::Text, &essay, at(2, 9)).unwrap();
        db.insert_artifact("u1", "book", day(9), OutputType::Text, "Outline", at(9, 9)).unwrap();
        db.insert_artifact("u1", "book", day(10), OutputType::Url, "https://git.dev/pr/4", at(10, 9))
            .unwrap();
        db.insert_artifact("u1", "other", day(10), OutputType::Text, &essay, at(10, 9)).unwrap();
        // Before the window
        let february = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        db.insert_artifact("u1", "book", february, OutputType::Text, &essay, at(1, 9)).unwrap();

        let stats =
            output_quality_stats(&db, "u1", day(11), Some(2), &AnalyticsConfig::default()).unwrap();
        assert_eq!(
            stats.weeks,
            vec![
                WeeklyDepth {
                    week_start: day(1),
                    shallow: 0,
                    standard: 0,
                    deep: 1
                },
                WeeklyDepth {
                    week_start: day(8),
                    shallow: 1,
                    standard: 1,
                    deep: 0
                },
            ]
        );
        let days: Vec<_> = stats.timeline.iter().map(|e| e.day).collect();
        assert_eq!(days, vec![day(10), day(9), day(2)]);
        assert_eq!(stats.timeline[0].depth, OutputDepth::Standard);
    }

    #[test]
    fn timeline_is_capped() {
        let db = LedgerDb::open_memory().unwrap();
        for d in 1..=25 {
            db.insert_artifact("u1", "book", day(d), OutputType::Text, "Progress log", at(d, 9))
                .unwrap();
        }
        let stats =
            output_quality_stats(&db, "u1", day(25), None, &AnalyticsConfig::default()).unwrap();
        assert_eq!(stats.weeks.len(), 8);
        assert_eq!(stats.timeline.len(), 20);
        assert_eq!(stats.timeline[0].day, day(25));
        let shallow: u32 = stats.weeks.iter().map(|w| w.shallow).sum();
        assert_eq!(shallow, 25);
    }
}
