//! Completion state computer.
//!
//! Recomputes whether a day is complete from the stored evidence and upserts
//! the day's [`DailyCompletion`] row. Every action that can change a day's
//! outcome calls [`recompute_day`] as its final step.
//!
//! `completed_at` marks the *first* time the day was complete. Once set it is
//! never cleared by recomputation, so the stored timestamp and the freshly
//! returned [`DayStatus::is_complete`] can disagree; the returned status is
//! authoritative for "is it complete right now". Only an explicit undo of the
//! output evidence clears it (see [`crate::actions::undo_output`]).

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::output::OutputType;
use crate::schedule::{PlanTask, ScheduleBlock};
use crate::storage::LedgerDb;
use crate::time::DayKey;

/// Live evaluation of a day, as returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub mandatory_blocks_done: bool,
    pub mandatory_tasks_done: bool,
    pub output_ready: bool,
    pub is_complete: bool,
    pub has_debt: bool,
    pub is_failure_day: bool,
}

/// Stored per-day record: output evidence plus derived flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCompletion {
    pub user_id: String,
    pub day: DayKey,
    pub output_type: Option<OutputType>,
    pub output_content: Option<String>,
    pub mandatory_blocks_done: bool,
    pub mandatory_tasks_done: bool,
    pub output_ready: bool,
    pub completed_at: Option<NaiveDateTime>,
}

impl DailyCompletion {
    /// Both output type and non-blank content are present.
    pub fn has_output(&self) -> bool {
        self.output_type.is_some() && self.has_output_content()
    }

    pub fn has_output_content(&self) -> bool {
        self.output_content
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }
}

/// Everything the completion rule looks at for one day.
#[derive(Debug, Clone, Copy)]
pub struct DayEvidence<'a> {
    pub mandatory_blocks: &'a [ScheduleBlock],
    pub completed_block_ids: &'a HashSet<String>,
    /// The day's plan tasks; non-mandatory ones are ignored.
    pub tasks: &'a [PlanTask],
    pub completion: Option<&'a DailyCompletion>,
    pub has_debt: bool,
    pub is_failure_day: bool,
}

impl DayEvidence<'_> {
    /// Apply the completion rule. No mandatory blocks or tasks means "done".
    pub fn evaluate(&self) -> DayStatus {
        let mandatory_blocks_done = self
            .mandatory_blocks
            .iter()
            .filter(|b| b.mandatory)
            .all(|b| self.completed_block_ids.contains(&b.id));
        let mandatory_tasks_done = self
            .tasks
            .iter()
            .filter(|t| t.mandatory)
            .all(PlanTask::is_completed);
        let output_ready = self.completion.is_some_and(DailyCompletion::has_output);

        DayStatus {
            mandatory_blocks_done,
            mandatory_tasks_done,
            output_ready,
            is_complete: !self.has_debt
                && !self.is_failure_day
                && mandatory_blocks_done
                && mandatory_tasks_done
                && output_ready,
            has_debt: self.has_debt,
            is_failure_day: self.is_failure_day,
        }
    }
}

/// Recompute `day` for `user_id` and upsert its completion row.
///
/// Any unresolved debt, on any date, blocks completion.
pub fn recompute_day(db: &LedgerDb, user_id: &str, day: DayKey, now: NaiveDateTime) -> Result<DayStatus> {
    db.with_transaction(|db| {
        let mandatory_blocks = db.mandatory_blocks(user_id)?;
        let completed_block_ids = db.completed_block_ids(user_id, day)?;
        let tasks = match db.plan_for_day(user_id, day)? {
            Some(plan) => db.plan_tasks_for_day(&plan.id, day)?,
            None => Vec::new(),
        };
        let completion = db.daily_completion(user_id, day)?;
        let is_failure_day = db.failure_day(user_id, day)?.is_some();
        let has_debt = db.oldest_unresolved_debt(user_id)?.is_some();

        let status = DayEvidence {
            mandatory_blocks: &mandatory_blocks,
            completed_block_ids: &completed_block_ids,
            tasks: &tasks,
            completion: completion.as_ref(),
            has_debt,
            is_failure_day,
        }
        .evaluate();

        let previous = completion.as_ref().and_then(|c| c.completed_at);
        let completed_at = previous.or_else(|| status.is_complete.then_some(now));
        db.upsert_day_flags(user_id, day, &status, completed_at)?;

        if previous.is_none() && completed_at.is_some() {
            info!(user = user_id, %day, "day completed");
        }
        debug!(user = user_id, %day, ?status, "day recomputed");
        Ok(status)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::BlockCategory;
    use chrono::NaiveDate;

    fn day() -> DayKey {
        NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
    }

    fn block(id: &str) -> ScheduleBlock {
        ScheduleBlock {
            id: id.into(),
            user_id: "u1".into(),
            name: id.into(),
            start_minute: 540,
            end_minute: 600,
            category: BlockCategory::CoreWork,
            mandatory: true,
        }
    }

    fn task(mandatory: bool, done: bool) -> PlanTask {
        PlanTask {
            id: "t".into(),
            plan_id: "p".into(),
            user_id: "u1".into(),
            day: day(),
            title: "Task".into(),
            category: None,
            mandatory,
            completed_at: done.then(|| day().and_hms_opt(10, 0, 0).unwrap()),
        }
    }

    fn with_output() -> DailyCompletion {
        DailyCompletion {
            user_id: "u1".into(),
            day: day(),
            output_type: Some(OutputType::Text),
            output_content: Some("Shipped the parser".into()),
            mandatory_blocks_done: false,
            mandatory_tasks_done: false,
            output_ready: false,
            completed_at: None,
        }
    }

    #[test]
    fn empty_schedule_is_vacuously_done() {
        let done = HashSet::new();
        let completion = with_output();
        let status = DayEvidence {
            mandatory_blocks: &[],
            completed_block_ids: &done,
            tasks: &[],
            completion: Some(&completion),
            has_debt: false,
            is_failure_day: false,
        }
        .evaluate();
        assert!(status.mandatory_blocks_done);
        assert!(status.mandatory_tasks_done);
        assert!(status.is_complete);
    }

    #[test]
    fn missing_output_blocks_completion() {
        let done = HashSet::new();
        let status = DayEvidence {
            mandatory_blocks: &[],
            completed_block_ids: &done,
            tasks: &[],
            completion: None,
            has_debt: false,
            is_failure_day: false,
        }
        .evaluate();
        assert!(!status.output_ready);
        assert!(!status.is_complete);
    }

    #[test]
    fn blank_output_content_is_not_ready() {
        let mut completion = with_output();
        completion.output_content = Some("   ".into());
        assert!(!completion.has_output());
    }

    #[test]
    fn optional_tasks_do_not_gate() {
        let done = HashSet::from(["b1".to_string()]);
        let completion = with_output();
        let blocks = [block("b1")];
        let tasks = [task(true, true), task(false, false)];
        let status = DayEvidence {
            mandatory_blocks: &blocks,
            completed_block_ids: &done,
            tasks: &tasks,
            completion: Some(&completion),
            has_debt: false,
            is_failure_day: false,
        }
        .evaluate();
        assert!(status.is_complete);
    }

    #[test]
    fn debt_and_failure_each_block_completion() {
        let done = HashSet::new();
        let completion = with_output();
        let base = DayEvidence {
            mandatory_blocks: &[],
            completed_block_ids: &done,
            tasks: &[],
            completion: Some(&completion),
            has_debt: true,
            is_failure_day: false,
        };
        let status = base.evaluate();
        assert!(status.has_debt && !status.is_complete);

        let status = DayEvidence {
            has_debt: false,
            is_failure_day: true,
            ..base
        }
        .evaluate();
        assert!(status.is_failure_day && !status.is_complete);
    }

    #[test]
    fn recompute_sets_completed_at_once() {
        let db = LedgerDb::open_memory().unwrap();
        let first = day().and_hms_opt(20, 0, 0).unwrap();
        db.set_output("u1", day(), OutputType::Text, "Shipped the parser").unwrap();

        let status = recompute_day(&db, "u1", day(), first).unwrap();
        assert!(status.is_complete);
        let stored = db.daily_completion("u1", day()).unwrap().unwrap();
        assert_eq!(stored.completed_at, Some(first));
        assert!(stored.output_ready);

        let later = day().and_hms_opt(22, 0, 0).unwrap();
        let again = recompute_day(&db, "u1", day(), later).unwrap();
        assert_eq!(again, status);
        assert_eq!(
            db.daily_completion("u1", day()).unwrap().unwrap().completed_at,
            Some(first)
        );
    }

    #[test]
    fn recompute_creates_row_lazily() {
        let db = LedgerDb::open_memory().unwrap();
        assert!(db.daily_completion("u1", day()).unwrap().is_none());
        let status = recompute_day(&db, "u1", day(), day().and_hms_opt(8, 0, 0).unwrap()).unwrap();
        assert!(!status.is_complete);
        let stored = db.daily_completion("u1", day()).unwrap().unwrap();
        assert_eq!(stored.completed_at, None);
        assert!(stored.mandatory_blocks_done);
    }
}
