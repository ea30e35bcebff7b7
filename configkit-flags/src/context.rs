//! Evaluation context (who is asking, and where).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Bucketing identity used when the context carries no user id
pub const ANONYMOUS_USER: &str = "anonymous";

/// Caller-supplied identity and environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_attributes: Option<HashMap<String, Value>>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_user_role(mut self, role: impl Into<String>) -> Self {
        self.user_role = Some(role.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_attributes
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// User id used for hashing, `"anonymous"` when unset
    pub fn bucketing_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(ANONYMOUS_USER)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.custom_attributes.as_ref()?.get(key)
    }

    /// Overwrite every field that `update` sets
    pub fn merge(&mut self, update: ContextUpdate) {
        if let Some(user_id) = update.user_id {
            self.user_id = Some(user_id);
        }
        if let Some(role) = update.user_role {
            self.user_role = Some(role);
        }
        if let Some(environment) = update.environment {
            self.environment = Some(environment);
        }
        if let Some(attributes) = update.custom_attributes {
            self.custom_attributes = Some(attributes);
        }
    }
}

/// Partial context; unset fields leave the target untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub custom_attributes: Option<HashMap<String, Value>>,
}

impl ContextUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn user_role(mut self, role: impl Into<String>) -> Self {
        self.user_role = Some(role.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Replace the whole attribute map
    pub fn custom_attributes(mut self, attributes: HashMap<String, Value>) -> Self {
        self.custom_attributes = Some(attributes);
        self
    }
}
