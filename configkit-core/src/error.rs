// Error types for configuration parsing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable classification of a schema violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Wrong JSON kind, or a required field is missing
    InvalidType,
    /// Value is not one of the allowed literals
    InvalidEnumValue,
    /// Number below the permitted minimum
    TooSmall,
    /// Number above the permitted maximum
    TooBig,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidType => "invalid_type",
            ErrorCode::InvalidEnumValue => "invalid_enum_value",
            ErrorCode::TooSmall => "too_small",
            ErrorCode::TooBig => "too_big",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `components.0.type`
    pub path: String,

    /// Human-readable message
    pub message: String,

    /// Violation class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Ordered collection of schema violations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Errors reported at exactly `path`
    pub fn at_path(&self, path: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.path == path).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::new(errors)
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid JSON: {0}")]
    Syntax(String),

    #[error("Configuration validation failed:\n{0}")]
    Validation(ValidationErrors),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid environment setting: {0}")]
    Env(String),
}

impl ConfigError {
    /// Input text was not well-formed JSON
    pub fn is_syntax(&self) -> bool {
        matches!(self, ConfigError::Syntax(_))
    }

    /// Input was well-formed but violated the document schema
    pub fn is_validation(&self) -> bool {
        matches!(self, ConfigError::Validation(_))
    }

    /// Schema violations, if this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ConfigError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_pairs() {
        let errors = ValidationErrors::new(vec![
            ValidationError::new("version", "Required").with_code(ErrorCode::InvalidType),
            ValidationError::new("components.0.id", "Expected string, received number"),
        ]);

        let err = ConfigError::from(errors);
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Configuration validation failed:\nversion: Required\ncomponents.0.id: Expected string, received number"
        );
    }

    #[test]
    fn test_syntax_error_prefix() {
        let err = ConfigError::Syntax("key must be a string at line 1 column 3".into());
        assert!(err.is_syntax());
        assert!(!err.is_validation());
        assert!(err.to_string().starts_with("Invalid JSON: "));
    }

    #[test]
    fn test_error_code_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCode::InvalidEnumValue).unwrap();
        assert_eq!(json, "\"invalid_enum_value\"");
    }
}
