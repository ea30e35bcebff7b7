// Configuration parser

use crate::error::{ConfigError, Result, ValidationError, ValidationErrors};
use crate::types::ConfigDocument;
use crate::validator::ConfigValidator;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Turns JSON text or values into validated [`ConfigDocument`]s
#[derive(Debug, Clone, Default)]
pub struct ConfigParser {
    validator: ConfigValidator,
}

impl ConfigParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(validator: ConfigValidator) -> Self {
        Self { validator }
    }

    /// Parse JSON text. Malformed text fails with [`ConfigError::Syntax`];
    /// well-formed text that violates the schema fails with
    /// [`ConfigError::Validation`].
    pub fn parse_from_string(&self, json: &str) -> Result<ConfigDocument> {
        let value = read_value(json).map_err(|e| {
            debug!(error = %e, "configuration text is not valid JSON");
            ConfigError::Syntax(e.to_string())
        })?;
        self.parse_from_value(value)
    }

    /// Validate an already-structured value and convert it
    pub fn parse_from_value(&self, value: Value) -> Result<ConfigDocument> {
        self.validator.validate_or_throw(&value)?;

        ConfigDocument::deserialize(serde_stacker::Deserializer::new(value)).map_err(|e| {
            ConfigError::Validation(ValidationErrors::new(vec![ValidationError::new(
                "",
                e.to_string(),
            )]))
        })
    }

    /// Read and parse a JSON file
    pub fn parse_from_file(&self, path: impl AsRef<Path>) -> Result<ConfigDocument> {
        let content = fs::read_to_string(path.as_ref())?;
        self.parse_from_string(&content)
    }

    /// Serialize a document; `pretty` selects two-space indentation
    pub fn stringify(&self, config: &ConfigDocument, pretty: bool) -> Result<String> {
        let out = if pretty {
            serde_json::to_string_pretty(config)
        } else {
            serde_json::to_string(config)
        };
        out.map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}

/// Parse JSON text with no nesting limit; component trees may be arbitrarily deep
fn read_value(json: &str) -> serde_json::Result<Value> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}
