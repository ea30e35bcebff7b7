//! Condition evaluation.
//!
//! A [`ConditionSpec`] is answered by dispatching on its type:
//!
//! - `featureFlag` asks the [`FeatureFlagManager`]
//! - `permission` asks an injected [`PermissionResolver`]
//! - `environment` compares the context environment (default `production`)
//! - `custom` runs a named [`CustomEvaluator`] or compares a context attribute
//!
//! Operators applied to operands of the wrong kind evaluate to `false`.

use crate::context::EvaluationContext;
use crate::flag::FeatureFlagManager;
use configkit_core::{ConditionSpec, ConditionType, DEFAULT_ENVIRONMENT, Operator};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Answers `permission` conditions
pub trait PermissionResolver: Send + Sync {
    fn resolve_permission(&self, permission_id: &str, context: &EvaluationContext) -> bool;
}

/// Externally supplied evaluator for `custom` conditions naming it
pub trait CustomEvaluator: Send + Sync {
    fn evaluate(&self, condition: &ConditionSpec, context: &EvaluationContext) -> bool;
}

impl<F> CustomEvaluator for F
where
    F: Fn(&ConditionSpec, &EvaluationContext) -> bool + Send + Sync,
{
    fn evaluate(&self, condition: &ConditionSpec, context: &EvaluationContext) -> bool {
        self(condition, context)
    }
}

/// Loose value equality: numbers compare by value, so `1` equals `1.0`
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Compare `actual` against `expected` with `operator`.
///
/// A missing `actual` equals nothing: `eq` and `in` are false, `ne` is true.
pub fn compare(actual: Option<&Value>, operator: Operator, expected: &Value) -> bool {
    match operator {
        Operator::Eq => actual.is_some_and(|a| values_equal(a, expected)),
        Operator::Ne => !actual.is_some_and(|a| values_equal(a, expected)),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let (Some(a), Some(b)) = (actual.and_then(Value::as_f64), expected.as_f64()) else {
                return false;
            };
            match operator {
                Operator::Gt => a > b,
                Operator::Gte => a >= b,
                Operator::Lt => a < b,
                _ => a <= b,
            }
        }
        Operator::In => match (actual, expected) {
            (Some(a), Value::Array(items)) => items.iter().any(|item| values_equal(a, item)),
            _ => false,
        },
        Operator::Contains => match (actual, expected) {
            (Some(Value::String(haystack)), Value::String(needle)) => haystack.contains(needle.as_str()),
            _ => false,
        },
    }
}

/// Evaluates conditions against a context
pub struct ConditionEvaluator {
    flags: Arc<FeatureFlagManager>,
    permissions: Option<Arc<dyn PermissionResolver>>,
    custom: RwLock<HashMap<String, Arc<dyn CustomEvaluator>>>,
}

impl ConditionEvaluator {
    /// Evaluator without a permission source; `permission` conditions are false
    pub fn new(flags: Arc<FeatureFlagManager>) -> Self {
        Self {
            flags,
            permissions: None,
            custom: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionResolver>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn flags(&self) -> &Arc<FeatureFlagManager> {
        &self.flags
    }

    /// Register a named evaluator for `custom` conditions
    pub fn register_custom(&self, name: impl Into<String>, evaluator: Arc<dyn CustomEvaluator>) {
        self.custom.write().insert(name.into(), evaluator);
    }

    pub fn unregister_custom(&self, name: &str) -> bool {
        self.custom.write().remove(name).is_some()
    }

    pub fn evaluate(&self, condition: &ConditionSpec, context: &EvaluationContext) -> bool {
        self.evaluate_with(condition, context, self.permissions.as_deref())
    }

    /// All conditions must hold; the first false one short-circuits
    pub fn evaluate_all(&self, conditions: &[ConditionSpec], context: &EvaluationContext) -> bool {
        conditions.iter().all(|c| self.evaluate(c, context))
    }

    /// Evaluate using `permissions` instead of the configured resolver
    pub fn evaluate_with(
        &self,
        condition: &ConditionSpec,
        context: &EvaluationContext,
        permissions: Option<&dyn PermissionResolver>,
    ) -> bool {
        let result = match condition.condition_type {
            ConditionType::FeatureFlag => self.flags.is_enabled_for(&condition.key, context),
            ConditionType::Permission => match permissions {
                Some(resolver) => resolver.resolve_permission(&condition.key, context),
                None => {
                    debug!(permission = %condition.key, "no permission resolver; condition is false");
                    false
                }
            },
            ConditionType::Environment => {
                let environment =
                    Value::String(context.environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT).to_string());
                compare(Some(&environment), condition.operator(), condition.value())
            }
            ConditionType::Custom => match &condition.evaluator {
                Some(name) => self.run_custom(name, condition, context),
                None => compare(context.attribute(&condition.key), condition.operator(), condition.value()),
            },
        };

        trace!(
            condition = ?condition.condition_type,
            key = %condition.key,
            result,
            "condition evaluated"
        );
        result
    }

    fn run_custom(&self, name: &str, condition: &ConditionSpec, context: &EvaluationContext) -> bool {
        let evaluator = self.custom.read().get(name).cloned();
        match evaluator {
            Some(evaluator) => evaluator.evaluate(condition, context),
            None => {
                debug!(evaluator = %name, "custom evaluator not registered; condition is false");
                false
            }
        }
    }
}

impl fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.custom.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("ConditionEvaluator")
            .field("flags", &self.flags)
            .field("permissions", &self.permissions.is_some())
            .field("custom", &names)
            .finish()
    }
}
