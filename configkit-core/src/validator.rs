// Configuration validator

use crate::error::{ConfigError, Result, ValidationError, ValidationErrors};
use crate::schema::SchemaWalker;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Outcome of validating an untyped document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Valid exactly when `errors` is empty
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(ConfigError::Validation(ValidationErrors::new(self.errors)))
        }
    }
}

/// Checks arbitrary JSON against the configuration document schema
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration value. Never fails; violations are returned
    /// in document order.
    pub fn validate(&self, config: &Value) -> ValidationResult {
        let mut walker = SchemaWalker::new();
        walker.document(config);
        let errors = walker.into_errors();

        if errors.is_empty() {
            ValidationResult::ok()
        } else {
            debug!(count = errors.len(), "configuration failed schema validation");
            ValidationResult::from_errors(errors)
        }
    }

    /// Validate and fail with every `path: message` pair when invalid
    pub fn validate_or_throw(&self, config: &Value) -> Result<()> {
        self.validate(config).into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_result_validity_follows_errors() {
        let result = ValidationResult::from_errors(Vec::new());
        assert_eq!(result, ValidationResult::ok());
        assert!(result.into_result().is_ok());

        let result = ValidationResult::from_errors(vec![ValidationError::new("version", "Required")]);
        assert!(!result.is_valid());
        assert!(result.into_result().unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_correct_configuration() {
        let config = json!({
            "version": "1.0.0",
            "components": [{ "id": "a", "type": "div" }]
        });

        let result = ConfigValidator::new().validate(&config);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_reject_missing_components() {
        let result = ConfigValidator::new().validate(&json!({ "version": "1.0.0" }));

        assert!(!result.valid);
        assert!(!result.errors.is_empty());
        assert!(result.errors.iter().any(|e| e.path.contains("components")));
        assert_eq!(result.errors[0].code, Some(ErrorCode::InvalidType));
    }

    #[test]
    fn test_validate_nested_components() {
        let config = json!({
            "version": "1.0.0",
            "components": [{
                "id": "parent",
                "type": "div",
                "children": [{ "id": "child", "type": "span" }]
            }]
        });

        assert!(ConfigValidator::new().validate(&config).valid);
    }

    #[test]
    fn test_validate_or_throw_aggregates_messages() {
        let err = ConfigValidator::new()
            .validate_or_throw(&json!({ "components": "nope" }))
            .unwrap_err();

        assert!(err.is_validation());
        let message = err.to_string();
        assert!(message.starts_with("Configuration validation failed:\n"));
        assert!(message.contains("version: Required"));
        assert!(message.contains("components: Expected array, received string"));
    }

    #[test]
    fn test_empty_components_is_valid() {
        let result = ConfigValidator::new().validate(&json!({ "version": "2", "components": [] }));
        assert!(result.is_valid());
    }
}
