//! Decision engine: the managers wired together behind one context.

use crate::ab_test::{ABTest, ABTestManager, ABTestVariant};
use crate::condition::{ConditionEvaluator, CustomEvaluator, PermissionResolver};
use crate::context::{ContextUpdate, EvaluationContext};
use crate::flag::FeatureFlagManager;
use crate::permission::{Permission, PermissionManager};
use configkit_core::{ComponentNode, ConfigDocument};
use std::sync::Arc;
use tracing::{debug, trace};

/// Feature flags, permissions, experiments and condition evaluation sharing
/// one evaluation context
#[derive(Debug)]
pub struct DecisionEngine {
    flags: Arc<FeatureFlagManager>,
    permissions: Arc<PermissionManager>,
    experiments: ABTestManager,
    evaluator: ConditionEvaluator,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(EvaluationContext::default())
    }
}

impl DecisionEngine {
    pub fn new(context: EvaluationContext) -> Self {
        let flags = Arc::new(FeatureFlagManager::with_context(context.clone()));
        let permissions = Arc::new(PermissionManager::new(Arc::clone(&flags)));
        let evaluator = ConditionEvaluator::new(Arc::clone(&flags))
            .with_permissions(Arc::clone(&permissions) as Arc<dyn PermissionResolver>);

        Self {
            flags,
            permissions,
            experiments: ABTestManager::with_context(context),
            evaluator,
        }
    }

    /// Engine with the document's features registered
    pub fn from_document(document: &ConfigDocument, context: EvaluationContext) -> Self {
        let engine = Self::new(context);
        engine.load_document(document);
        engine
    }

    /// Register every feature the document declares
    pub fn load_document(&self, document: &ConfigDocument) {
        let features = document.features();
        debug!(features = features.len(), "loading document features");
        self.flags.register_many(features.iter().cloned());
    }

    pub fn flags(&self) -> &FeatureFlagManager {
        &self.flags
    }

    pub fn permissions(&self) -> &PermissionManager {
        &self.permissions
    }

    pub fn experiments(&self) -> &ABTestManager {
        &self.experiments
    }

    pub fn evaluator(&self) -> &ConditionEvaluator {
        &self.evaluator
    }

    pub fn register_permission(&self, permission: Permission) {
        self.permissions.register(permission);
    }

    pub fn register_experiment(&self, test: ABTest) {
        self.experiments.register(test);
    }

    /// Make a named evaluator available to component and permission conditions
    pub fn register_custom(&self, name: impl Into<String>, evaluator: Arc<dyn CustomEvaluator>) {
        let name = name.into();
        self.permissions.evaluator().register_custom(name.clone(), Arc::clone(&evaluator));
        self.evaluator.register_custom(name, evaluator);
    }

    pub fn context(&self) -> EvaluationContext {
        self.permissions.context()
    }

    /// Apply a partial context update to every manager
    pub fn update_context(&self, update: ContextUpdate) {
        self.permissions.update_context(update.clone());
        self.experiments.update_context(update);
    }

    pub fn is_enabled(&self, feature_id: &str) -> bool {
        self.flags.is_enabled(feature_id)
    }

    pub fn has_permission(&self, permission_id: &str) -> bool {
        self.permissions.has_permission(permission_id)
    }

    pub fn get_variant(&self, test_id: &str) -> Option<ABTestVariant> {
        self.experiments.get_variant(test_id)
    }

    /// Whether a node renders for the current context
    pub fn is_visible(&self, node: &ComponentNode) -> bool {
        self.is_visible_for(node, &self.context())
    }

    /// A node renders only when every one of its conditions holds
    pub fn is_visible_for(&self, node: &ComponentNode, context: &EvaluationContext) -> bool {
        let visible = self.evaluator.evaluate_all(node.conditions(), context);
        if !visible {
            trace!(component = %node.id, "component hidden by conditions");
        }
        visible
    }

    /// The nodes that render for the current context
    pub fn visible_components(&self, nodes: &[ComponentNode]) -> Vec<ComponentNode> {
        self.visible_components_for(nodes, &self.context())
    }

    /// Copy of `nodes` with hidden nodes removed along with their subtrees
    pub fn visible_components_for(
        &self,
        nodes: &[ComponentNode],
        context: &EvaluationContext,
    ) -> Vec<ComponentNode> {
        nodes.iter().filter_map(|node| self.prune(node, context)).collect()
    }

    fn prune(&self, node: &ComponentNode, context: &EvaluationContext) -> Option<ComponentNode> {
        if !self.is_visible_for(node, context) {
            return None;
        }

        let mut visible = node.clone();
        visible.children = node
            .children
            .as_ref()
            .map(|children| self.visible_components_for(children, context));
        Some(visible)
    }
}
