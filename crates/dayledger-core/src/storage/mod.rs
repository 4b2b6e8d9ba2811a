mod config;
pub mod database;
pub mod migrations;
mod records;

pub use config::{AnalyticsConfig, Config, DailyWinSettings, LoggingConfig, RulesConfig};
pub use database::{HistorySnapshot, LedgerDb};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `DAYLEDGER_HOME` wins when set; otherwise `~/.config/dayledger[-dev]/`
/// depending on `DAYLEDGER_ENV=dev`.
///
/// # Errors
/// Returns an error if no home directory can be determined or the directory
/// cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("DAYLEDGER_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".config");
            let env = std::env::var("DAYLEDGER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("dayledger-dev")
            } else {
                base_dir.join("dayledger")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
