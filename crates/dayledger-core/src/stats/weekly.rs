//! One-line summaries of recently reviewed weeks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::streak::percent;
use crate::error::Result;
use crate::review::ReviewAnswers;
use crate::storage::LedgerDb;
use crate::time::{add_days, day_range, DayKey};

/// Reviews summarized, newest first
pub const SUMMARY_LIMIT: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub week_start: DayKey,
    /// Completed days out of seven, as a rounded percentage
    pub completion_rate: u32,
    /// Day with the most completed tasks; the earliest wins ties
    pub most_productive_day: DayKey,
    /// First non-empty of q2, q1 and stop_doing
    pub quote: String,
}

fn quote(answers: &ReviewAnswers) -> String {
    [&answers.q2, &answers.q1, &answers.stop_doing]
        .into_iter()
        .find(|a| !a.is_empty())
        .cloned()
        .unwrap_or_default()
}

/// Summaries for the most recent reviewed weeks, newest first.
pub fn weekly_summaries(db: &LedgerDb, user_id: &str) -> Result<Vec<WeeklySummary>> {
    db.with_transaction(|db| {
        db.recent_weekly_reviews(user_id, SUMMARY_LIMIT)?
            .into_iter()
            .map(|review| -> Result<WeeklySummary> {
                let ws = review.week_start;
                let we = add_days(ws, 7)?;
                let completed_days = db.count_completed_between(user_id, ws, we)?;

                let mut tasks_done: HashMap<DayKey, u32> = HashMap::new();
                for task in db.tasks_between(user_id, ws, we)? {
                    if task.is_completed() {
                        *tasks_done.entry(task.day).or_insert(0) += 1;
                    }
                }
                let mut most_productive_day = ws;
                let mut best = 0;
                for day in day_range(ws, 7) {
                    let done = tasks_done.get(&day).copied().unwrap_or(0);
                    if done > best {
                        best = done;
                        most_productive_day = day;
                    }
                }

                Ok(WeeklySummary {
                    week_start: ws,
                    completion_rate: percent(completed_days, 7),
                    most_productive_day,
                    quote: quote(&review.answers),
                })
            })
            .collect()
    })
}
