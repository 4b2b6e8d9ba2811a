//! Daily output evidence: the proof-of-work a user attaches to a day.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::DayKey;

const TEXT_MIN_CHARS: usize = 5;
const TEXT_MAX_CHARS: usize = 2000;
const URL_MAX_CHARS: usize = 1000;

/// Words that mark text proof as filler rather than real output.
const PLACEHOLDER_WORDS: [&str; 5] = ["lorem", "placeholder", "todo", "example", "test"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputType {
    Text,
    Url,
    File,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Text => "TEXT",
            OutputType::Url => "URL",
            OutputType::File => "FILE",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Ok(OutputType::Text),
            "URL" => Ok(OutputType::Url),
            "FILE" => Ok(OutputType::File),
            other => Err(ValidationError::InvalidValue {
                field: "output_type",
                message: format!("unknown output type '{other}'"),
            }),
        }
    }
}

/// An artifact recorded against the user's active goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalArtifact {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub day: DayKey,
    pub kind: OutputType,
    pub content: String,
    pub created_at: NaiveDateTime,
}

/// Validate output content for its type and return the trimmed content.
///
/// File uploads are handled by the capture subsystem; here a file output is
/// just a non-empty reference.
pub fn validate_output(output_type: OutputType, content: &str) -> Result<String, ValidationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyField("output_content"));
    }
    match output_type {
        OutputType::Text => {
            let chars = content.chars().count();
            if !(TEXT_MIN_CHARS..=TEXT_MAX_CHARS).contains(&chars) {
                return Err(ValidationError::InvalidValue {
                    field: "output_content",
                    message: format!(
                        "text proof must be {TEXT_MIN_CHARS}-{TEXT_MAX_CHARS} characters"
                    ),
                });
            }
            let lowered = content.to_lowercase();
            if PLACEHOLDER_WORDS.iter().any(|w| lowered.contains(w)) {
                return Err(placeholder());
            }
        }
        OutputType::Url => {
            if content.chars().count() > URL_MAX_CHARS {
                return Err(ValidationError::InvalidValue {
                    field: "output_content",
                    message: format!("URL must be at most {URL_MAX_CHARS} characters"),
                });
            }
            let parsed = url::Url::parse(content).map_err(|e| ValidationError::InvalidValue {
                field: "output_content",
                message: format!("provide a valid URL: {e}"),
            })?;
            let is_example = parsed
                .host_str()
                .is_some_and(|h| h == "example.com" || h.ends_with(".example.com"));
            if is_example {
                return Err(placeholder());
            }
        }
        OutputType::File => {}
    }
    Ok(content.to_string())
}

fn placeholder() -> ValidationError {
    ValidationError::InvalidValue {
        field: "output_content",
        message: "proof looks like a placeholder".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_output_bounds() {
        assert!(validate_output(OutputType::Text, "Drafted chapter two").is_ok());
        assert!(validate_output(OutputType::Text, "abc").is_err());
        assert!(validate_output(OutputType::Text, &"x".repeat(2001)).is_err());
        assert_eq!(
            validate_output(OutputType::Text, "  Outlined the talk  ").unwrap(),
            "Outlined the talk"
        );
    }

    #[test]
    fn text_placeholders_are_rejected() {
        assert!(validate_output(OutputType::Text, "Lorem ipsum dolor").is_err());
        assert!(validate_output(OutputType::Text, "TODO fill this in").is_err());
    }

    #[test]
    fn url_output_must_parse() {
        assert!(validate_output(OutputType::Url, "https://github.com/me/repo/pull/4").is_ok());
        assert!(validate_output(OutputType::Url, "not a url").is_err());
        assert!(validate_output(OutputType::Url, "https://example.com/proof").is_err());
    }

    #[test]
    fn empty_output_is_rejected() {
        assert_eq!(
            validate_output(OutputType::File, "   "),
            Err(ValidationError::EmptyField("output_content"))
        );
    }

    #[test]
    fn output_type_parses() {
        assert_eq!("url".parse::<OutputType>().unwrap(), OutputType::Url);
        assert!("video".parse::<OutputType>().is_err());
    }
}
