// Runtime settings loaded from the environment

use crate::error::{ConfigError, Result};
use crate::logging::{LogConfig, LogFormat, LogLevel};
use std::env;
use std::path::Path;

/// Prefix for ConfigKit environment variables
pub const ENV_PREFIX: &str = "CONFIGKIT";

/// Environment assumed when neither the settings nor the evaluation
/// context name one
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Environment variable loader
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// A single variable, `KEY` becoming `PREFIX_KEY`
    pub fn load_var(&self, key: &str) -> Option<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(full_key).ok()
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|| default.to_string())
    }
}

/// Process-level settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Default environment name for evaluation contexts
    pub environment: String,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Json,
        }
    }
}

impl Settings {
    /// Read `CONFIGKIT_ENVIRONMENT`, `CONFIGKIT_LOG_LEVEL` and
    /// `CONFIGKIT_LOG_FORMAT`, falling back to defaults for unset variables
    pub fn from_env() -> Result<Self> {
        Self::from_loader(&EnvLoader::new(Some(ENV_PREFIX.to_string())))
    }

    /// Load a `.env` file into the process environment, then [`Settings::from_env`]
    pub fn from_dotenv(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::from_path(path.as_ref()).map_err(|e| ConfigError::Env(e.to_string()))?;
        Self::from_env()
    }

    pub fn from_loader(loader: &EnvLoader) -> Result<Self> {
        let defaults = Self::default();

        let environment = loader.load_var_or("ENVIRONMENT", &defaults.environment);
        let log_level = match loader.load_var("LOG_LEVEL") {
            Some(raw) => raw.parse().map_err(ConfigError::Env)?,
            None => defaults.log_level,
        };
        let log_format = match loader.load_var("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(ConfigError::Env)?,
            None => defaults.log_format,
        };

        Ok(Self {
            environment,
            log_level,
            log_format,
        })
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Logging configuration derived from these settings
    pub fn log_config(&self) -> LogConfig {
        LogConfig::new().level(self.log_level).format(self.log_format)
    }
}
