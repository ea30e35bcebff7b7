//! Role and condition based permissions.

use crate::condition::{ConditionEvaluator, PermissionResolver};
use crate::context::{ContextUpdate, EvaluationContext};
use crate::flag::FeatureFlagManager;
use configkit_core::ConditionSpec;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Permission definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    pub name: String,
    /// Roles allowed to hold the permission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Every condition must hold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<ConditionSpec>>,
}

impl Permission {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: None,
            conditions: None,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_condition(mut self, condition: ConditionSpec) -> Self {
        self.conditions.get_or_insert_with(Vec::new).push(condition);
        self
    }
}

/// Permission registry bound to an evaluation context
#[derive(Debug)]
pub struct PermissionManager {
    permissions: RwLock<HashMap<String, Permission>>,
    context: RwLock<EvaluationContext>,
    flags: Arc<FeatureFlagManager>,
    evaluator: ConditionEvaluator,
}

impl Default for PermissionManager {
    fn default() -> Self {
        Self::new(Arc::new(FeatureFlagManager::new()))
    }
}

impl PermissionManager {
    /// Manager sharing `flags` for `featureFlag` conditions; starts from the
    /// flag manager's context
    pub fn new(flags: Arc<FeatureFlagManager>) -> Self {
        Self {
            permissions: RwLock::new(HashMap::new()),
            context: RwLock::new(flags.context()),
            evaluator: ConditionEvaluator::new(Arc::clone(&flags)),
            flags,
        }
    }

    pub fn with_context(self, context: EvaluationContext) -> Self {
        *self.context.write() = context;
        self
    }

    pub fn flags(&self) -> &Arc<FeatureFlagManager> {
        &self.flags
    }

    /// Evaluator used for permission conditions; register custom evaluators here
    pub fn evaluator(&self) -> &ConditionEvaluator {
        &self.evaluator
    }

    pub fn register(&self, permission: Permission) {
        debug!(permission = %permission.id, "registering permission");
        self.permissions.write().insert(permission.id.clone(), permission);
    }

    pub fn register_many<I>(&self, permissions: I)
    where
        I: IntoIterator<Item = Permission>,
    {
        let mut registry = self.permissions.write();
        for permission in permissions {
            registry.insert(permission.id.clone(), permission);
        }
    }

    pub fn unregister(&self, permission_id: &str) -> Option<Permission> {
        self.permissions.write().remove(permission_id)
    }

    /// Whether the manager's current context holds a permission
    pub fn has_permission(&self, permission_id: &str) -> bool {
        let context = self.context.read().clone();
        self.has_permission_for(permission_id, &context)
    }

    /// Whether `context` holds a permission. Unknown permissions are denied.
    pub fn has_permission_for(&self, permission_id: &str, context: &EvaluationContext) -> bool {
        let resolution = Resolution {
            manager: self,
            visiting: Mutex::new(Vec::new()),
        };
        resolution.resolve_permission(permission_id, context)
    }

    fn check(&self, permission: &Permission, context: &EvaluationContext, resolver: &Resolution<'_>) -> bool {
        // The role gate only applies when the context names a role
        if let (Some(roles), Some(role)) = (&permission.roles, &context.user_role)
            && !roles.contains(role)
        {
            debug!(permission = %permission.id, role = %role, "role not allowed");
            return false;
        }

        permission.conditions.as_deref().unwrap_or_default().iter().all(|condition| {
            self.evaluator
                .evaluate_with(condition, context, Some(resolver as &dyn PermissionResolver))
        })
    }

    pub fn get_permission(&self, permission_id: &str) -> Option<Permission> {
        self.permissions.read().get(permission_id).cloned()
    }

    /// Registered permission ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.permissions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.permissions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.read().is_empty()
    }

    pub fn context(&self) -> EvaluationContext {
        self.context.read().clone()
    }

    /// Merge into this manager's context and the shared flag manager's
    pub fn update_context(&self, update: ContextUpdate) {
        self.context.write().merge(update.clone());
        self.flags.update_context(update);
    }

    pub fn clear(&self) {
        self.permissions.write().clear();
    }
}

impl PermissionResolver for PermissionManager {
    fn resolve_permission(&self, permission_id: &str, context: &EvaluationContext) -> bool {
        self.has_permission_for(permission_id, context)
    }
}

/// One top-level permission check; tracks the permissions being resolved so
/// that permissions referring to each other terminate
struct Resolution<'a> {
    manager: &'a PermissionManager,
    visiting: Mutex<Vec<String>>,
}

impl PermissionResolver for Resolution<'_> {
    fn resolve_permission(&self, permission_id: &str, context: &EvaluationContext) -> bool {
        // Clone out so no registry lock is held while conditions recurse
        let Some(permission) = self.manager.get_permission(permission_id) else {
            debug!(permission = %permission_id, "unknown permission denied");
            return false;
        };

        {
            let mut visiting = self.visiting.lock();
            if visiting.iter().any(|id| id == permission_id) {
                warn!(
                    permission = %permission_id,
                    chain = ?visiting.as_slice(),
                    "cyclic permission reference denied"
                );
                return false;
            }
            visiting.push(permission_id.to_string());
        }

        let granted = self.manager.check(&permission, context, self);
        self.visiting.lock().pop();
        granted
    }
}
