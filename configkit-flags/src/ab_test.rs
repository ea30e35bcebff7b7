//! A/B experiments with sticky weighted assignment.
//!
//! The first lookup for a `(test, user)` pair picks a variant from the
//! experiment hash and caches it. Later lookups return the cached variant
//! for as long as it remains in the test, even if variants are added.

use crate::context::{ContextUpdate, EvaluationContext};
use crate::hash::experiment_hash;
use configkit_core::ValueMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Experiment definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ABTest {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub variants: Vec<ABTestVariant>,
}

impl ABTest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            variants: Vec::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_variant(mut self, variant: ABTestVariant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn total_weight(&self) -> f64 {
        self.variants.iter().map(|v| v.weight).sum()
    }

    pub fn variant(&self, variant_id: &str) -> Option<&ABTestVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Variant for a raw experiment hash: walk the variants accumulating
    /// weight and take the first whose running total exceeds `hash % total`
    fn pick(&self, hash: u32) -> Option<&ABTestVariant> {
        let total = self.total_weight();
        if self.variants.is_empty() || total <= 0.0 {
            return None;
        }

        let point = f64::from(hash) % total;
        let mut cumulative = 0.0;
        for variant in &self.variants {
            cumulative += variant.weight;
            if point < cumulative {
                return Some(variant);
            }
        }
        self.variants.first()
    }
}

/// One arm of an experiment. Weights are relative and need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ABTestVariant {
    pub id: String,
    pub name: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ValueMap>,
}

impl ABTestVariant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            config: None,
        }
    }

    pub fn with_config(mut self, config: ValueMap) -> Self {
        self.config = Some(config);
        self
    }
}

type AssignmentKey = (String, String);

/// Experiment registry with a sticky assignment cache
#[derive(Debug, Default)]
pub struct ABTestManager {
    tests: RwLock<HashMap<String, ABTest>>,
    assignments: RwLock<HashMap<AssignmentKey, String>>,
    context: RwLock<EvaluationContext>,
}

impl ABTestManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: EvaluationContext) -> Self {
        Self {
            context: RwLock::new(context),
            ..Self::default()
        }
    }

    /// Register a test, replacing any existing one with the same id.
    /// Existing assignments are kept.
    pub fn register(&self, test: ABTest) {
        debug!(test = %test.id, variants = test.variants.len(), "registering experiment");
        self.tests.write().insert(test.id.clone(), test);
    }

    pub fn register_many<I>(&self, tests: I)
    where
        I: IntoIterator<Item = ABTest>,
    {
        let mut registry = self.tests.write();
        for test in tests {
            registry.insert(test.id.clone(), test);
        }
    }

    /// Remove a test together with its assignments
    pub fn unregister(&self, test_id: &str) -> Option<ABTest> {
        let removed = self.tests.write().remove(test_id);
        self.assignments.write().retain(|(id, _), _| id != test_id);
        removed
    }

    /// Variant for the manager's current context
    pub fn get_variant(&self, test_id: &str) -> Option<ABTestVariant> {
        let context = self.context.read().clone();
        self.variant_for(test_id, &context)
    }

    /// Variant for an explicit context.
    ///
    /// `None` when the test is unknown, disabled, has no variants or has no
    /// positive total weight. Concurrent first lookups for the same user
    /// agree on one assignment.
    pub fn variant_for(&self, test_id: &str, context: &EvaluationContext) -> Option<ABTestVariant> {
        let test = self.tests.read().get(test_id).cloned();
        let Some(test) = test else {
            debug!(test = %test_id, "unknown experiment");
            return None;
        };
        if !test.enabled {
            trace!(test = %test_id, "experiment disabled");
            return None;
        }

        let user_id = context.bucketing_id();
        let key = (test_id.to_string(), user_id.to_string());

        if let Some(variant) = Self::sticky(&test, self.assignments.read().get(&key)) {
            return Some(variant.clone());
        }

        let mut assignments = self.assignments.write();
        // Another caller may have assigned while we waited for the lock
        if let Some(variant) = Self::sticky(&test, assignments.get(&key)) {
            return Some(variant.clone());
        }

        let variant = test.pick(experiment_hash(test_id, user_id))?.clone();
        debug!(test = %test_id, user = %user_id, variant = %variant.id, "assigned variant");
        assignments.insert(key, variant.id.clone());
        Some(variant)
    }

    fn sticky<'t>(test: &'t ABTest, assigned: Option<&String>) -> Option<&'t ABTestVariant> {
        assigned.and_then(|variant_id| test.variant(variant_id))
    }

    /// Cached variant id for a user, if one has been assigned
    pub fn assignment(&self, test_id: &str, user_id: &str) -> Option<String> {
        self.assignments
            .read()
            .get(&(test_id.to_string(), user_id.to_string()))
            .cloned()
    }

    pub fn get_test(&self, test_id: &str) -> Option<ABTest> {
        self.tests.read().get(test_id).cloned()
    }

    /// Registered test ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tests.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tests.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.read().is_empty()
    }

    pub fn context(&self) -> EvaluationContext {
        self.context.read().clone()
    }

    pub fn update_context(&self, update: ContextUpdate) {
        self.context.write().merge(update);
    }

    /// Forget every test and every assignment
    pub fn clear(&self) {
        self.tests.write().clear();
        self.assignments.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn two_way(id: &str) -> ABTest {
        ABTest::new(id, "Two way")
            .with_variant(ABTestVariant::new("a", "A", 50.0))
            .with_variant(ABTestVariant::new("b", "B", 50.0))
    }

    fn user(id: &str) -> EvaluationContext {
        EvaluationContext::new().with_user_id(id)
    }

    #[test]
    fn test_unknown_or_disabled_returns_none() {
        let manager = ABTestManager::new();
        assert!(manager.get_variant("missing").is_none());

        manager.register(two_way("off").enabled(false));
        assert!(manager.get_variant("off").is_none());
    }

    #[test]
    fn test_empty_or_weightless_returns_none() {
        let manager = ABTestManager::new();
        manager.register(ABTest::new("empty", "Empty"));
        manager.register(
            ABTest::new("zero", "Zero")
                .with_variant(ABTestVariant::new("a", "A", 0.0))
                .with_variant(ABTestVariant::new("b", "B", 0.0)),
        );

        assert!(manager.get_variant("empty").is_none());
        assert!(manager.get_variant("zero").is_none());
        assert!(manager.assignment("zero", "anonymous").is_none());
    }

    #[test]
    fn test_weighted_selection_is_deterministic() {
        let manager = ABTestManager::new();
        // hash("exp:u1") % 100 == 19
        manager.register(two_way("exp"));
        assert_eq!(manager.variant_for("exp", &user("u1")).map(|v| v.id), Some("a".into()));

        // hash("exp:u1") % 3 == 2
        let manager = ABTestManager::new();
        manager.register(
            ABTest::new("exp", "Three way")
                .with_variant(ABTestVariant::new("x", "X", 1.0))
                .with_variant(ABTestVariant::new("y", "Y", 1.0))
                .with_variant(ABTestVariant::new("z", "Z", 1.0)),
        );
        assert_eq!(manager.variant_for("exp", &user("u1")).map(|v| v.id), Some("z".into()));
    }

    #[test]
    fn test_assignment_is_sticky() {
        let manager = ABTestManager::with_context(user("u1"));
        manager.register(two_way("exp"));

        let first = manager.get_variant("exp").map(|v| v.id);
        manager.register(two_way("unrelated"));
        for _ in 0..20 {
            assert_eq!(manager.get_variant("exp").map(|v| v.id), first);
        }
        assert_eq!(manager.assignment("exp", "u1"), first);
    }

    #[test]
    fn test_assignment_survives_added_variants() {
        let manager = ABTestManager::new();
        manager.register(two_way("exp"));
        assert_eq!(manager.variant_for("exp", &user("u1")).map(|v| v.id), Some("a".into()));

        // A fresh assignment would now land on "c" (hash % 1100 == 119)
        let widened = ABTest::new("exp", "Widened")
            .with_variant(ABTestVariant::new("c", "C", 1000.0))
            .with_variant(ABTestVariant::new("a", "A", 50.0))
            .with_variant(ABTestVariant::new("b", "B", 50.0));
        manager.register(widened.clone());
        assert_eq!(manager.variant_for("exp", &user("u1")).map(|v| v.id), Some("a".into()));

        let fresh = ABTestManager::new();
        fresh.register(widened);
        assert_eq!(fresh.variant_for("exp", &user("u1")).map(|v| v.id), Some("c".into()));
    }

    #[test]
    fn test_removed_variant_is_reassigned() {
        let manager = ABTestManager::new();
        manager.register(two_way("exp"));
        assert_eq!(manager.variant_for("exp", &user("u1")).map(|v| v.id), Some("a".into()));

        manager.register(
            ABTest::new("exp", "Narrowed")
                .with_variant(ABTestVariant::new("c", "C", 1000.0))
                .with_variant(ABTestVariant::new("b", "B", 50.0)),
        );
        assert_eq!(manager.variant_for("exp", &user("u1")).map(|v| v.id), Some("c".into()));
        assert_eq!(manager.assignment("exp", "u1"), Some("c".into()));
    }

    #[test]
    fn test_anonymous_bucketing() {
        let manager = ABTestManager::new();
        manager.register(two_way("exp"));
        // hash("exp:anonymous") % 100 == 12
        assert_eq!(manager.get_variant("exp").map(|v| v.id), Some("a".into()));
        assert_eq!(manager.assignment("exp", "anonymous"), Some("a".into()));
    }

    #[test]
    fn test_unregister_and_clear_forget_assignments() {
        let manager = ABTestManager::new();
        manager.register(two_way("exp"));
        manager.register(two_way("other"));
        manager.variant_for("exp", &user("u1"));
        manager.variant_for("other", &user("u1"));

        assert!(manager.unregister("exp").is_some());
        assert!(manager.assignment("exp", "u1").is_none());
        assert!(manager.assignment("other", "u1").is_some());

        manager.clear();
        assert!(manager.is_empty());
        assert!(manager.assignment("other", "u1").is_none());
    }

    #[test]
    fn test_weight_proportionality() {
        let manager = ABTestManager::new();
        manager.register(
            ABTest::new("checkout", "Checkout")
                .with_variant(ABTestVariant::new("control", "Control", 70.0))
                .with_variant(ABTestVariant::new("treatment", "Treatment", 30.0)),
        );

        let total = 10_000;
        let control = (0..total)
            .filter_map(|i| manager.variant_for("checkout", &user(&format!("user-{i}"))))
            .filter(|v| v.id == "control")
            .count();
        let ratio = control as f64 / total as f64;
        assert!((ratio - 0.7).abs() < 0.05, "control ratio {ratio}");
    }

    #[test]
    fn test_concurrent_first_assignment_agrees() {
        let manager = Arc::new(ABTestManager::new());
        manager.register(two_way("race"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || manager.variant_for("race", &user("racer")).map(|v| v.id))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.iter().all(|r| r.is_some() && *r == results[0]));
        assert_eq!(manager.assignment("race", "racer"), results[0]);
    }

    #[test]
    fn test_variant_config_round_trips() {
        let mut config = ValueMap::new();
        config.insert("color".into(), serde_json::json!("green"));
        let test = ABTest::new("t", "T").with_variant(ABTestVariant::new("v", "V", 1.0).with_config(config));

        let value = serde_json::to_value(&test).unwrap();
        assert_eq!(value["variants"][0]["config"]["color"], "green");
        let back: ABTest = serde_json::from_value(value).unwrap();
        assert_eq!(back, test);
    }
}
