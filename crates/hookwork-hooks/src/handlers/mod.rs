//! Action handlers and the registry that resolves action types to them
//!
//! An action's `type` names a handler registered here. Handlers receive the
//! action parameters with every `{{placeholder}}` already resolved, plus the
//! shared execution context.
//!
//! # Examples
//!
//! ```ignore
//! use hookwork_hooks::handlers::{handler_fn, ActionHandlerRegistry};
//! use serde_json::json;
//!
//! let registry = ActionHandlerRegistry::new();
//! registry.register(
//!     "generate_audio",
//!     handler_fn(|params, _ctx| async move {
//!         Ok(json!({"queued": params["post_id"].clone()}))
//!     }),
//! )?;
//! ```

pub mod builtin;

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{HooksError, Result},
    types::ExecutionContext,
};

/// Executes one kind of action
///
/// Implementations must be cheap to share: the registry hands out
/// `Arc<dyn ActionHandler>` and the runner moves a clone into a spawned task
/// for every attempt.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the action
    ///
    /// # Arguments
    ///
    /// * `params` - Action parameters with placeholders resolved
    /// * `context` - Context of the triggering event
    ///
    /// # Returns
    ///
    /// Handler output, stored in the action outcome. An error counts as a
    /// failed attempt and is retried while the action has budget left.
    async fn handle(&self, params: Value, context: Arc<ExecutionContext>) -> Result<Value>;
}

/// Adapter turning an async closure into an [`ActionHandler`]
pub struct FnHandler<F> {
    func: F,
}

/// Wrap an async closure as a handler
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(Value, Arc<ExecutionContext>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    FnHandler { func }
}

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(Value, Arc<ExecutionContext>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn handle(&self, params: Value, context: Arc<ExecutionContext>) -> Result<Value> {
        (self.func)(params, context).await
    }
}

/// Maps action type names to handlers
///
/// Registering a name twice replaces the earlier handler.
#[derive(Clone, Default)]
pub struct ActionHandlerRegistry {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn ActionHandler>>>>,
}

impl ActionHandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for an action type
    pub fn register<H>(&self, action_type: impl Into<String>, handler: H) -> Result<()>
    where
        H: ActionHandler + 'static,
    {
        self.register_arc(action_type, Arc::new(handler))
    }

    /// Register an already shared handler
    pub fn register_arc(
        &self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<()> {
        let action_type = action_type.into();
        let mut handlers = self.handlers.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        if handlers.insert(action_type.clone(), handler).is_some() {
            debug!(action_type = %action_type, "Replaced action handler");
        } else {
            debug!(action_type = %action_type, "Registered action handler");
        }

        Ok(())
    }

    /// Remove the handler for an action type, returning whether one existed
    pub fn unregister(&self, action_type: &str) -> Result<bool> {
        let mut handlers = self.handlers.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        Ok(handlers.remove(action_type).is_some())
    }

    /// Resolve an action type
    ///
    /// Fails with [`HooksError::UnknownActionType`] when nothing is registered.
    pub fn resolve(&self, action_type: &str) -> Result<Arc<dyn ActionHandler>> {
        let handlers = self.handlers.read().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;

        handlers
            .get(action_type)
            .cloned()
            .ok_or_else(|| HooksError::UnknownActionType(action_type.to_string()))
    }

    /// Whether a handler is registered for the action type
    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(action_type))
            .unwrap_or(false)
    }

    /// Registered action type names, sorted
    pub fn action_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .map(|handlers| handlers.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl fmt::Debug for ActionHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandlerRegistry")
            .field("action_types", &self.action_types())
            .finish()
    }
}
