//! Feature flag registry and evaluation.

use crate::context::{ContextUpdate, EvaluationContext};
use crate::hash::rollout_bucket;
use configkit_core::{FeatureDefinition, RolloutPolicy};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Why a rollout gate turned a feature off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    Percentage,
    UserIds,
    Environments,
}

/// Apply the rollout gates in order: percentage, user allowlist,
/// environment allowlist. The first rejection wins.
pub fn check_rollout(
    feature_id: &str,
    rollout: &RolloutPolicy,
    context: &EvaluationContext,
) -> Result<(), GateRejection> {
    if let Some(percentage) = rollout.percentage {
        let bucket = rollout_bucket(feature_id, context.bucketing_id());
        // A bucket equal to the percentage is admitted, so 0% still admits bucket 0
        if f64::from(bucket) > percentage {
            return Err(GateRejection::Percentage);
        }
    }

    // Allowlists only apply when the context carries the field they check
    if let (Some(allowed), Some(user_id)) = (&rollout.user_ids, &context.user_id)
        && !allowed.contains(user_id)
    {
        return Err(GateRejection::UserIds);
    }

    if let (Some(allowed), Some(environment)) = (&rollout.environments, &context.environment)
        && !allowed.contains(environment)
    {
        return Err(GateRejection::Environments);
    }

    Ok(())
}

/// Decide a single feature for a context
pub fn evaluate_feature(feature: &FeatureDefinition, context: &EvaluationContext) -> bool {
    if !feature.enabled {
        return false;
    }

    match &feature.rollout {
        None => true,
        Some(rollout) => match check_rollout(&feature.id, rollout, context) {
            Ok(()) => true,
            Err(gate) => {
                trace!(feature = %feature.id, ?gate, "rollout gate rejected context");
                false
            }
        },
    }
}

/// In-memory feature registry bound to an evaluation context
#[derive(Debug, Default)]
pub struct FeatureFlagManager {
    features: RwLock<HashMap<String, FeatureDefinition>>,
    context: RwLock<EvaluationContext>,
}

impl FeatureFlagManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: EvaluationContext) -> Self {
        Self {
            features: RwLock::new(HashMap::new()),
            context: RwLock::new(context),
        }
    }

    /// Register a feature, replacing any existing one with the same id
    pub fn register(&self, feature: FeatureDefinition) {
        debug!(feature = %feature.id, enabled = feature.enabled, "registering feature");
        self.features.write().insert(feature.id.clone(), feature);
    }

    pub fn register_many<I>(&self, features: I)
    where
        I: IntoIterator<Item = FeatureDefinition>,
    {
        let mut registry = self.features.write();
        for feature in features {
            registry.insert(feature.id.clone(), feature);
        }
    }

    pub fn unregister(&self, feature_id: &str) -> Option<FeatureDefinition> {
        self.features.write().remove(feature_id)
    }

    /// Whether a feature is on for the manager's current context
    pub fn is_enabled(&self, feature_id: &str) -> bool {
        let context = self.context.read().clone();
        self.is_enabled_for(feature_id, &context)
    }

    /// Whether a feature is on for an explicit context. Unknown features are off.
    pub fn is_enabled_for(&self, feature_id: &str, context: &EvaluationContext) -> bool {
        match self.features.read().get(feature_id) {
            Some(feature) => evaluate_feature(feature, context),
            None => {
                debug!(feature = %feature_id, "unknown feature evaluated as disabled");
                false
            }
        }
    }

    /// Ids of every feature on for the current context
    pub fn enabled_features(&self) -> Vec<String> {
        let context = self.context.read().clone();
        let mut ids: Vec<String> = self
            .features
            .read()
            .values()
            .filter(|f| evaluate_feature(f, &context))
            .map(|f| f.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn get_feature(&self, feature_id: &str) -> Option<FeatureDefinition> {
        self.features.read().get(feature_id).cloned()
    }

    /// Registered feature ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.features.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.features.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.read().is_empty()
    }

    pub fn context(&self) -> EvaluationContext {
        self.context.read().clone()
    }

    pub fn update_context(&self, update: ContextUpdate) {
        self.context.write().merge(update);
    }

    pub fn clear(&self) {
        self.features.write().clear();
    }
}
