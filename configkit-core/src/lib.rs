//! ConfigKit core
//!
//! Configuration document model, schema validation and parsing for the
//! ConfigKit UI toolkit, plus the lifecycle hooks fired around each
//! processing stage.
//!
//! # Parsing
//!
//! ```
//! use configkit_core::ConfigParser;
//!
//! let parser = ConfigParser::new();
//! let config = parser
//!     .parse_from_string(r#"{"version":"1.0.0","components":[{"id":"a","type":"div"}]}"#)
//!     .unwrap();
//!
//! assert_eq!(config.components[0].component_type, "div");
//! ```
//!
//! # Validation
//!
//! ```
//! use configkit_core::ConfigValidator;
//! use serde_json::json;
//!
//! let result = ConfigValidator::new().validate(&json!({ "version": "1.0.0" }));
//! assert!(!result.valid);
//! assert_eq!(result.errors[0].path, "components");
//! ```

pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod parser;
mod schema;
pub mod settings;
pub mod types;
pub mod validator;

pub use error::{ConfigError, ErrorCode, Result, ValidationError, ValidationErrors};
pub use lifecycle::{
    HookCallback, HookError, HookId, LifecycleError, LifecycleHook, LifecycleManager,
    LifecycleResult,
};
pub use parser::ConfigParser;
pub use settings::{DEFAULT_ENVIRONMENT, EnvLoader, Settings};
pub use types::*;
pub use validator::{ConfigValidator, ValidationResult};
