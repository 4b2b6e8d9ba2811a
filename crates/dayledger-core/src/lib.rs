//! # Dayledger Core Library
//!
//! This library implements the rules engine behind a day-execution tracker:
//! given the commitments a user planned and the evidence they recorded, it
//! decides whether each day counts, who owes what, and how the weeks trend.
//! Everything is available through the standalone CLI binary, which is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Completion State Computer**: recomputes a day from stored evidence and
//!   upserts its completion row
//! - **Execution Debt**: lazily opened for past days with missed mandatory
//!   blocks; any unresolved debt blocks completion of every day
//! - **Daily Win / Quiet Weeks / Failure Days**: the relief valves, each with
//!   its own limit
//! - **Analytics and Insights**: read-only rollups over one consistent snapshot
//! - **Storage**: SQLite ledger and TOML configuration
//!
//! "Now" is always passed in explicitly; nothing here reads the system clock.
//!
//! ## Key Components
//!
//! - [`LedgerDb`]: persistence for every record the engine reads or writes
//! - [`recompute_day`]: the completion rule
//! - [`Config`]: engine tunables

pub mod actions;
pub mod annotations;
pub mod daily_win;
pub mod debt;
pub mod error;
pub mod failure;
pub mod insights;
pub mod output;
pub mod progress;
pub mod quiet;
pub mod review;
pub mod schedule;
pub mod stats;
pub mod storage;
pub mod time;

pub use actions::{DayOutcome, DaySummary, TodayView};
pub use daily_win::{DailyWin, DailyWinConfig, SatisfiedBy};
pub use debt::{ExecutionDebt, ResolutionType};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use failure::{CycleAllowance, FailureDay};
pub use insights::{Trend, WeeklyInsights};
pub use output::{GoalArtifact, OutputType};
pub use progress::{recompute_day, DailyCompletion, DayStatus};
pub use quiet::QuietWeek;
pub use review::{ReviewAnswers, WeeklyReview};
pub use schedule::{BlockCategory, NewBlock, NewTask, Plan, PlanTask, ScheduleBlock};
pub use storage::{Config, HistorySnapshot, LedgerDb};
pub use time::DayKey;
