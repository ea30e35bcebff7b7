//! ConfigKit - configuration-driven UI toolkit core
//!
//! Parses and validates JSON UI documents, then decides which parts of the
//! component tree a given user sees through feature flags, conditions,
//! permissions and A/B experiments.
//!
//! ```
//! use configkit::prelude::*;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let kit = ConfigKit::new(Settings::default());
//! kit.parse_value(json!({
//!     "version": "1.0.0",
//!     "components": [
//!         { "id": "header", "type": "div" },
//!         {
//!             "id": "beta-banner",
//!             "type": "banner",
//!             "conditions": [{ "type": "featureFlag", "key": "beta" }]
//!         }
//!     ],
//!     "features": [{ "id": "beta", "name": "Beta", "enabled": false }]
//! }))
//! .await
//! .unwrap();
//!
//! let plan = kit.render_plan(None).await.unwrap();
//! assert_eq!(plan.len(), 1);
//! assert_eq!(plan[0].id, "header");
//! # });
//! ```

pub use configkit_core::{
    ConfigDocument, ConfigError, ConfigParser, ConfigValidator, LifecycleError, LifecycleHook,
    LifecycleManager, Settings, ValidationResult,
};
pub use configkit_flags::{
    ABTestManager, ConditionEvaluator, ContextUpdate, DecisionEngine, EvaluationContext,
    FeatureFlagManager, PermissionManager,
};

use configkit_core::ComponentNode;
use configkit_core::logging::WorkerGuard;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Commonly used types
pub mod prelude {
    pub use crate::{ConfigKit, Error};
    pub use configkit_core::{
        ComponentNode, ConditionSpec, ConditionType, ConfigDocument, ConfigError, ConfigParser,
        ConfigValidator, FeatureDefinition, LifecycleHook, Operator, RolloutPolicy, Settings,
    };
    pub use configkit_flags::{
        ABTest, ABTestVariant, ContextUpdate, DecisionEngine, EvaluationContext, Permission,
    };
}

/// Loading or rendering failed
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parser, lifecycle hooks and decision engine around one loaded document
#[derive(Debug)]
pub struct ConfigKit {
    settings: Settings,
    parser: ConfigParser,
    lifecycle: LifecycleManager,
    engine: DecisionEngine,
    document: RwLock<Option<ConfigDocument>>,
}

impl Default for ConfigKit {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl ConfigKit {
    /// Kit whose evaluation context starts in `settings.environment`
    pub fn new(settings: Settings) -> Self {
        let context = EvaluationContext::new().with_environment(settings.environment.clone());
        Self {
            settings,
            parser: ConfigParser::new(),
            lifecycle: LifecycleManager::new(),
            engine: DecisionEngine::new(context),
            document: RwLock::new(None),
        }
    }

    /// Kit configured from `CONFIGKIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Settings::from_env()?))
    }

    /// Install the global log subscriber described by the settings
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        Ok(self.settings.log_config().init().map_err(ConfigError::from)?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// The currently loaded document
    pub async fn document(&self) -> Option<ConfigDocument> {
        self.document.read().await.clone()
    }

    /// Parse JSON text and load it
    pub async fn parse_str(&self, json: &str) -> Result<ConfigDocument> {
        let document = self.parser.parse_from_string(json)?;
        self.load(document).await
    }

    /// Validate a structured value and load it
    pub async fn parse_value(&self, value: Value) -> Result<ConfigDocument> {
        let document = self.parser.parse_from_value(value)?;
        self.load(document).await
    }

    /// Read a JSON file and load it
    pub async fn parse_file(&self, path: impl AsRef<Path>) -> Result<ConfigDocument> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::from)?;
        debug!(path = %path.display(), "read configuration file");
        self.parse_str(&text).await
    }

    /// Fire `onParse` then `onValidate`, then make the document current
    async fn load(&self, document: ConfigDocument) -> Result<ConfigDocument> {
        let value = to_value(&document)?;
        self.lifecycle
            .execute(LifecycleHook::OnParse, vec![value.clone()])
            .await?;
        self.lifecycle
            .execute(LifecycleHook::OnValidate, vec![value])
            .await?;

        self.install(document.clone()).await;
        info!(
            version = %document.version,
            components = document.components.len(),
            "configuration loaded"
        );
        Ok(document)
    }

    /// Fire `onUpdate`, then replace the current document with an
    /// already-validated one. A failing hook leaves the current document
    /// and its features in place.
    pub async fn update(&self, document: ConfigDocument) -> Result<()> {
        let value = to_value(&document)?;
        self.lifecycle
            .execute(LifecycleHook::OnUpdate, vec![value])
            .await?;
        self.install(document).await;
        Ok(())
    }

    /// Swap in a document; its features replace those of the previous one
    async fn install(&self, document: ConfigDocument) {
        let mut current = self.document.write().await;
        if let Some(previous) = current.as_ref() {
            for feature in previous.features() {
                self.engine.flags().unregister(&feature.id);
            }
        }
        self.engine.load_document(&document);
        *current = Some(document);
    }

    /// Apply a partial context update to the engine
    pub fn update_context(&self, update: ContextUpdate) {
        self.engine.update_context(update);
    }

    /// Fire `onRender` and return the component tree visible for `context`,
    /// or for the engine's own context when `None`. Empty when no document
    /// is loaded.
    pub async fn render_plan(&self, context: Option<&EvaluationContext>) -> Result<Vec<ComponentNode>> {
        let Some(document) = self.document().await else {
            return Ok(Vec::new());
        };

        let context = context.cloned().unwrap_or_else(|| self.engine.context());
        let args = vec![to_value(&document)?, to_value(&context)?];
        self.lifecycle.execute(LifecycleHook::OnRender, args).await?;

        Ok(self
            .engine
            .visible_components_for(&document.components, &context))
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Config(ConfigError::Serialization(e.to_string())))
}
