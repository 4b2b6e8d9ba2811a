pub mod block;
pub mod config;
pub mod day;
pub mod debt;
pub mod failure;
pub mod insights;
pub mod output;
pub mod plan;
pub mod quiet;
pub mod review;
pub mod stats;
pub mod win;

use chrono::NaiveDateTime;
use dayledger_core::time::{day_key, parse_day, parse_timestamp};
use dayledger_core::{Config, DayKey, LedgerDb, ValidationError};
use serde::Serialize;

/// Everything a command needs to act on behalf of one user at one instant.
pub struct Context {
    pub db: LedgerDb,
    pub config: Config,
    pub user_id: String,
    pub now: NaiveDateTime,
}

impl Context {
    pub fn new(
        config: Config,
        user: Option<String>,
        now: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let now = match now {
            Some(raw) => parse_timestamp(raw)?,
            None => chrono::Local::now().naive_local(),
        };
        Ok(Self {
            db: LedgerDb::open()?,
            user_id: user.unwrap_or_else(|| config.user_id.clone()),
            config,
            now,
        })
    }

    pub fn today(&self) -> DayKey {
        day_key(self.now)
    }

    /// The `--day` argument, or today when omitted.
    pub fn day(&self, raw: Option<&str>) -> Result<DayKey, ValidationError> {
        raw.map_or(Ok(self.today()), parse_day)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
