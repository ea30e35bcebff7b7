//! Decision layer for ConfigKit
//!
//! Feature flags with percentage rollout, declarative conditions,
//! role/condition permissions and sticky A/B experiments, all answered
//! for an [`EvaluationContext`].
//!
//! Lookups of unknown ids and comparisons between mismatched values never
//! fail: they degrade to "off", "denied", `false` or `None`.
//!
//! # Feature Flags
//!
//! ```
//! use configkit_core::{FeatureDefinition, RolloutPolicy};
//! use configkit_flags::*;
//!
//! let flags = FeatureFlagManager::with_context(EvaluationContext::new().with_user_id("user-123"));
//! flags.register(FeatureDefinition::new("new-ui", "New UI", true));
//! flags.register(
//!     FeatureDefinition::new("beta", "Beta", true)
//!         .with_rollout(RolloutPolicy::new().user_ids(["alice"])),
//! );
//!
//! assert!(flags.is_enabled("new-ui"));
//! assert!(!flags.is_enabled("beta"));
//! assert!(!flags.is_enabled("unknown"));
//! ```
//!
//! # Permissions
//!
//! ```
//! use configkit_core::ConditionSpec;
//! use configkit_flags::*;
//!
//! let permissions = PermissionManager::default()
//!     .with_context(EvaluationContext::new().with_user_role("editor"));
//! permissions.register(Permission::new("edit", "Edit").with_roles(["admin", "editor"]));
//! permissions.register(
//!     Permission::new("publish", "Publish")
//!         .with_condition(ConditionSpec::permission("edit"))
//!         .with_condition(ConditionSpec::feature_flag("publishing")),
//! );
//!
//! assert!(permissions.has_permission("edit"));
//! // "publishing" is not registered, so the second condition fails
//! assert!(!permissions.has_permission("publish"));
//! ```
//!
//! # A/B Testing
//!
//! ```
//! use configkit_flags::*;
//!
//! let experiments = ABTestManager::with_context(EvaluationContext::new().with_user_id("u1"));
//! experiments.register(
//!     ABTest::new("checkout", "Checkout flow")
//!         .with_variant(ABTestVariant::new("control", "Control", 70.0))
//!         .with_variant(ABTestVariant::new("one-page", "One page", 30.0)),
//! );
//!
//! let first = experiments.get_variant("checkout").map(|v| v.id);
//! assert!(first.is_some());
//! assert_eq!(experiments.get_variant("checkout").map(|v| v.id), first);
//! ```

pub mod ab_test;
pub mod condition;
pub mod context;
pub mod engine;
pub mod flag;
pub mod hash;
pub mod permission;

pub use ab_test::{ABTest, ABTestManager, ABTestVariant};
pub use condition::{ConditionEvaluator, CustomEvaluator, PermissionResolver, compare};
pub use context::{ANONYMOUS_USER, ContextUpdate, EvaluationContext};
pub use engine::DecisionEngine;
pub use flag::{FeatureFlagManager, GateRejection, check_rollout, evaluate_feature};
pub use hash::{experiment_hash, rollout_bucket, string_hash};
pub use permission::{Permission, PermissionManager};
