//! Core error types for dayledger-core.
//!
//! Every engine operation either returns its result or one of the named,
//! caller-surfaced failures below. Storage and configuration problems are
//! wrapped separately so callers can tell a rule violation from a broken
//! environment.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for dayledger-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The entity does not exist or is not owned by the acting user
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Quiet mode was used too recently
    #[error("Quiet mode cooldown active for week of {week_start}; available from {available_from}")]
    CooldownActive {
        week_start: NaiveDate,
        available_from: NaiveDate,
    },

    /// Failure-day allowance exhausted for the current plan cycle
    #[error("Failure day limit of {limit} reached for cycle {cycle_start}..{cycle_end}")]
    LimitReached {
        limit: u32,
        cycle_start: NaiveDate,
        cycle_end: NaiveDate,
    },

    /// A write-once record already exists for this key
    #[error("{entity} already exists for {key}")]
    AlreadyExists { entity: &'static str, key: String },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A uniqueness or foreign-key constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded
    #[error("Corrupt value in column '{column}': {value}")]
    CorruptValue { column: &'static str, value: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// No home directory to place the data directory in
    #[error("Could not determine the data directory")]
    NoDataDir,
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A required free-text field was empty
    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),

    /// Malformed date
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Malformed time of day
    #[error("Invalid time '{0}': expected HH:MM")]
    InvalidTime(String),

    /// Invalid minute range
    #[error("Invalid time range: start ({start}) must be before end ({end}) within 0..=1440")]
    InvalidTimeRange { start: u32, end: u32 },

    /// Candidate block overlaps an existing block
    #[error("Block overlaps existing block '{0}'")]
    Overlap(String),

    /// Day arithmetic left the representable calendar
    #[error("Date out of range: {day} offset by {days} days")]
    DateOutOfRange { day: NaiveDate, days: i64 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => match code.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::ConstraintViolation => {
                    DatabaseError::ConstraintViolation(err.to_string())
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl CoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Short machine-readable code, used by the CLI's JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NotFound",
            CoreError::Validation(_) => "ValidationError",
            CoreError::CooldownActive { .. } => "CooldownActive",
            CoreError::LimitReached { .. } => "LimitReached",
            CoreError::AlreadyExists { .. } => "AlreadyExists",
            CoreError::Database(_) => "DatabaseError",
            CoreError::Config(_) => "ConfigError",
            CoreError::Io(_) => "IoError",
            CoreError::Json(_) => "JsonError",
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
