//! Lifecycle hook system.
//!
//! Named hooks fire around the parse, validate, render and update stages.
//! Firing a hook runs every registered callback concurrently and waits for
//! all of them; the first failure is returned to the caller.
//!
//! ## Examples
//!
//! ```
//! use configkit_core::lifecycle::{LifecycleHook, LifecycleManager};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let manager = LifecycleManager::new();
//! let id = manager.register_fn(LifecycleHook::OnParse, |args| async move {
//!     assert_eq!(args.len(), 1);
//!     Ok(())
//! });
//!
//! manager
//!     .execute(LifecycleHook::OnParse, vec![json!({ "version": "1.0.0" })])
//!     .await
//!     .unwrap();
//!
//! assert!(manager.unregister(LifecycleHook::OnParse, id));
//! # });
//! ```

use async_trait::async_trait;
use futures::future::try_join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

/// Error returned by a hook callback
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for hook callbacks
pub type LifecycleResult = Result<(), HookError>;

/// Processing stage a callback subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleHook {
    OnParse,
    OnValidate,
    OnRender,
    OnUpdate,
}

impl LifecycleHook {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleHook::OnParse => "onParse",
            LifecycleHook::OnValidate => "onValidate",
            LifecycleHook::OnRender => "onRender",
            LifecycleHook::OnUpdate => "onUpdate",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook callback failed
#[derive(Error, Debug)]
#[error("{hook} hook failed: {source}")]
pub struct LifecycleError {
    pub hook: LifecycleHook,
    pub source: HookError,
}

/// Callback subscribed to a lifecycle hook
#[async_trait]
pub trait HookCallback: Send + Sync {
    async fn call(&self, args: &[Value]) -> LifecycleResult;
}

/// Adapter turning an async closure into a [`HookCallback`]
pub struct FnHook<F> {
    f: F,
}

impl<F> FnHook<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> HookCallback for FnHook<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LifecycleResult> + Send + 'static,
{
    async fn call(&self, args: &[Value]) -> LifecycleResult {
        (self.f)(args.to_vec()).await
    }
}

/// Handle identifying one registration, used to unregister it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type Registration = (HookId, Arc<dyn HookCallback>);

/// Registry of callbacks keyed by hook
pub struct LifecycleManager {
    hooks: RwLock<HashMap<LifecycleHook, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a callback to a hook
    pub fn register(&self, hook: LifecycleHook, callback: Arc<dyn HookCallback>) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hooks
            .write()
            .entry(hook)
            .or_default()
            .push((id, callback));
        debug!(hook = %hook, "lifecycle callback registered");
        id
    }

    /// Subscribe an async closure to a hook
    pub fn register_fn<F, Fut>(&self, hook: LifecycleHook, f: F) -> HookId
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.register(hook, Arc::new(FnHook::new(f)))
    }

    /// Remove one registration. Returns `false` if it was not registered.
    pub fn unregister(&self, hook: LifecycleHook, id: HookId) -> bool {
        let mut hooks = self.hooks.write();
        let Some(callbacks) = hooks.get_mut(&hook) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        before != callbacks.len()
    }

    /// Run every callback for `hook` concurrently and wait for all of them
    pub async fn execute(&self, hook: LifecycleHook, args: Vec<Value>) -> Result<(), LifecycleError> {
        let callbacks: Vec<Arc<dyn HookCallback>> = self
            .hooks
            .read()
            .get(&hook)
            .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        if callbacks.is_empty() {
            return Ok(());
        }

        debug!(hook = %hook, callbacks = callbacks.len(), "executing lifecycle hook");

        try_join_all(callbacks.iter().map(|cb| cb.call(&args)))
            .await
            .map(|_| ())
            .map_err(|source| LifecycleError { hook, source })
    }

    /// Number of callbacks registered for `hook`
    pub fn hook_count(&self, hook: LifecycleHook) -> usize {
        self.hooks.read().get(&hook).map_or(0, Vec::len)
    }

    /// Remove all callbacks for one hook
    pub fn clear(&self, hook: LifecycleHook) {
        self.hooks.write().remove(&hook);
    }

    /// Remove every callback
    pub fn clear_all(&self) {
        self.hooks.write().clear();
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<LifecycleHook, usize> = self
            .hooks
            .read()
            .iter()
            .map(|(hook, list)| (*hook, list.len()))
            .collect();
        f.debug_struct("LifecycleManager")
            .field("hooks", &counts)
            .finish()
    }
}
