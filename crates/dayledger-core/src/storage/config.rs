//! TOML-based application configuration.
//!
//! Stores engine tunables:
//! - Rule limits (failure-day cap, plan cycle fallback, quiet-mode cooldown)
//! - Daily-win defaults
//! - Analytics windows
//! - Log filter and the acting user id
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::schedule::{BlockCategory, MAX_PLAN_DAYS};

/// Limits enforced by the rules engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Failure days allowed per plan cycle
    #[serde(default = "default_failure_day_cap")]
    pub failure_day_cap: u32,
    /// Cycle length used when no plan covers the day
    #[serde(default = "default_cycle_days")]
    pub default_cycle_days: u32,
    /// Minimum days between two quiet weeks
    #[serde(default = "default_quiet_cooldown_days")]
    pub quiet_cooldown_days: u32,
    /// A failure followed by a completion within this many days counts as recovered
    #[serde(default = "default_recovery_threshold_days")]
    pub recovery_threshold_days: u32,
}

/// Daily-win defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWinSettings {
    /// A mandatory block in this category becomes the default pinned block
    #[serde(default = "default_primary_category")]
    pub primary_category: BlockCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_completion_window_days")]
    pub completion_window_days: u32,
    #[serde(default = "default_max_window_days")]
    pub max_window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Identity the CLI acts as
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub daily_win: DailyWinSettings,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_failure_day_cap() -> u32 {
    2
}
fn default_cycle_days() -> u32 {
    30
}
fn default_quiet_cooldown_days() -> u32 {
    14
}
fn default_recovery_threshold_days() -> u32 {
    3
}
fn default_primary_category() -> BlockCategory {
    BlockCategory::CoreWork
}
fn default_completion_window_days() -> u32 {
    7
}
fn default_max_window_days() -> u32 {
    90
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_user_id() -> String {
    "local".into()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            failure_day_cap: default_failure_day_cap(),
            default_cycle_days: default_cycle_days(),
            quiet_cooldown_days: default_quiet_cooldown_days(),
            recovery_threshold_days: default_recovery_threshold_days(),
        }
    }
}

impl Default for DailyWinSettings {
    fn default() -> Self {
        Self {
            primary_category: default_primary_category(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            completion_window_days: default_completion_window_days(),
            max_window_days: default_max_window_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            rules: RulesConfig::default(),
            daily_win: DailyWinSettings::default(),
            analytics: AnalyticsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Clamp a requested trailing window to `1..=max_window_days`.
    pub fn clamp_window(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_window_days.max(1))
    }

    /// Clamp a requested number of whole weeks to the same window bound.
    pub fn clamp_weeks(&self, requested: u32) -> u32 {
        requested.clamp(1, (self.max_window_days / 7).max(1))
    }
}

impl Config {
    /// Check every day-count tunable against the range the engine can
    /// do calendar arithmetic with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let day_counts = [
            ("rules.default_cycle_days", self.rules.default_cycle_days, 1),
            ("rules.quiet_cooldown_days", self.rules.quiet_cooldown_days, 0),
            ("rules.recovery_threshold_days", self.rules.recovery_threshold_days, 0),
            ("analytics.completion_window_days", self.analytics.completion_window_days, 1),
            ("analytics.max_window_days", self.analytics.max_window_days, 1),
        ];
        for (key, value, min) in day_counts {
            if !(min..=MAX_PLAN_DAYS).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("must be between {min} and {MAX_PLAN_DAYS} days, got {value}"),
                });
            }
        }
        Ok(())
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none_or(|p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => serde_json::Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                        .into(),
                ),
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return (and persist) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there when it is missing.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// into the field's type, or the result fails [`Config::validate`]. The
    /// config is left untouched on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[rules]\nfailure_day_cap = 4\n").unwrap();
        assert_eq!(parsed.rules.failure_day_cap, 4);
        assert_eq!(parsed.rules.quiet_cooldown_days, 14);
        assert_eq!(parsed.daily_win.primary_category, BlockCategory::CoreWork);
        assert_eq!(parsed.user_id, "local");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("rules.failure_day_cap").as_deref(), Some("2"));
        assert_eq!(cfg.get("daily_win.primary_category").as_deref(), Some("CoreWork"));
        assert_eq!(cfg.get("user_id").as_deref(), Some("local"));
        assert!(cfg.get("rules.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("rules.quiet_cooldown_days", "21").unwrap();
        assert_eq!(cfg.rules.quiet_cooldown_days, 21);
    }

    #[test]
    fn apply_updates_enum_field() {
        let mut cfg = Config::default();
        cfg.apply("daily_win.primary_category", "Learning").unwrap();
        assert_eq!(cfg.daily_win.primary_category, BlockCategory::Learning);
        assert!(cfg.apply("daily_win.primary_category", "Napping").is_err());
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("rules.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.apply("", "1").is_err());
    }

    #[test]
    fn apply_rejects_invalid_number() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("rules.failure_day_cap", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.rules.failure_day_cap, 2);
    }

    #[test]
    fn apply_rejects_day_counts_outside_the_calendar() {
        let mut cfg = Config::default();
        for (key, value) in [
            ("rules.default_cycle_days", "4294967295"),
            ("rules.default_cycle_days", "0"),
            ("rules.quiet_cooldown_days", "4294967295"),
            ("analytics.max_window_days", "3651"),
        ] {
            assert!(
                matches!(cfg.apply(key, value), Err(ConfigError::InvalidValue { .. })),
                "{key}={value} accepted"
            );
        }
        assert_eq!(cfg, Config::default());
        cfg.apply("rules.default_cycle_days", "3650").unwrap();
        assert_eq!(cfg.rules.default_cycle_days, 3650);
    }

    #[test]
    fn load_from_rejects_out_of_range_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[rules]\ndefault_cycle_days = 4294967295\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn clamp_window_bounds() {
        let analytics = AnalyticsConfig::default();
        assert_eq!(analytics.clamp_window(0), 1);
        assert_eq!(analytics.clamp_window(30), 30);
        assert_eq!(analytics.clamp_window(365), 90);
        assert_eq!(analytics.clamp_weeks(0), 1);
        assert_eq!(analytics.clamp_weeks(8), 8);
        assert_eq!(analytics.clamp_weeks(52), 12);
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.apply("analytics.completion_window_days", "14").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().analytics.completion_window_days, 14);
    }
}
