//! Weekly review answers. A week's review is write-once.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};
use crate::storage::LedgerDb;
use crate::time::{day_key, week_start, DayKey};

/// Free-text answers to the weekly review prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewAnswers {
    pub q1: String,
    pub q2: String,
    pub q3: String,
    pub q4: String,
    /// One habit to drop next week
    pub stop_doing: String,
    /// The block that met the most resistance
    pub resistance_block: String,
}

impl ReviewAnswers {
    fn trimmed(self) -> Self {
        Self {
            q1: self.q1.trim().to_string(),
            q2: self.q2.trim().to_string(),
            q3: self.q3.trim().to_string(),
            q4: self.q4.trim().to_string(),
            stop_doing: self.stop_doing.trim().to_string(),
            resistance_block: self.resistance_block.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReview {
    pub user_id: String,
    pub week_start: DayKey,
    #[serde(flatten)]
    pub answers: ReviewAnswers,
    pub created_at: NaiveDateTime,
}

/// Store the current week's review.
///
/// # Errors
/// `AlreadyExists` when the week was already reviewed.
pub fn submit_weekly_review(
    db: &LedgerDb,
    user_id: &str,
    now: NaiveDateTime,
    answers: ReviewAnswers,
) -> Result<WeeklyReview> {
    let review = WeeklyReview {
        user_id: user_id.to_string(),
        week_start: week_start(day_key(now)),
        answers: answers.trimmed(),
        created_at: now,
    };
    if !db.insert_weekly_review(&review)? {
        return Err(CoreError::AlreadyExists {
            entity: "WeeklyReview",
            key: review.week_start.to_string(),
        });
    }
    info!(user = user_id, week_start = %review.week_start, "weekly review submitted");
    Ok(review)
}

/// The review for the week containing `day`.
pub fn weekly_review(db: &LedgerDb, user_id: &str, day: DayKey) -> Result<Option<WeeklyReview>> {
    db.weekly_review(user_id, week_start(day))
}
