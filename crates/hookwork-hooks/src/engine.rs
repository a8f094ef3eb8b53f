//! The engine value tying all components together
//!
//! A [`HookEngine`] owns one rule cache, handler registry, observer set and
//! execution worker. Nothing is global: two engines in one process are fully
//! independent.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use hookwork_hooks::{handler_fn, ContextOverrides, HookEngine, InMemoryRuleStore, TriggerKind};
//! use serde_json::json;
//!
//! let engine = HookEngine::builder(Arc::new(InMemoryRuleStore::new()))
//!     .handler("generate_audio", handler_fn(|params, _ctx| async move {
//!         Ok(json!({"queued": params["post_id"].clone()}))
//!     }))
//!     .build()?;
//! engine.start().await;
//!
//! let matched = engine.trigger(
//!     TriggerKind::PostPublished,
//!     json!({"id": 42, "content": "..."}),
//!     ContextOverrides::default().with_user("editor-1"),
//! )?;
//! engine.wait_idle().await?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::{
    cache::RuleCache,
    config::{ConfigValidator, EngineConfig},
    dispatcher::{Dispatcher, ExecutionQueue},
    error::Result,
    events::TriggerKind,
    executor::DefaultRuleExecutor,
    handlers::{builtin::register_builtin_handlers, ActionHandler, ActionHandlerRegistry},
    manager::RuleManager,
    notify::{Notifier, RuleObserver},
    recorder::StatsRecorder,
    store::RuleStore,
    types::{ContextOverrides, ExecutionLogEntry, NewRule, Rule, RuleUpdate},
};

/// Builder for [`HookEngine`]
pub struct HookEngineBuilder {
    store: Arc<dyn RuleStore>,
    config: EngineConfig,
    handlers: Vec<(String, Arc<dyn ActionHandler>)>,
    observers: Vec<Arc<dyn RuleObserver>>,
    builtin_handlers: bool,
}

impl HookEngineBuilder {
    /// Use these engine settings instead of the defaults
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an action handler
    pub fn handler<H>(mut self, action_type: impl Into<String>, handler: H) -> Self
    where
        H: ActionHandler + 'static,
    {
        self.handlers.push((action_type.into(), Arc::new(handler)));
        self
    }

    /// Register the built-in `log`, `webhook` and `command` handlers
    ///
    /// Handlers added with [`HookEngineBuilder::handler`] take precedence.
    pub fn with_builtin_handlers(mut self) -> Self {
        self.builtin_handlers = true;
        self
    }

    /// Add a lifecycle observer
    pub fn observer(mut self, observer: Arc<dyn RuleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the engine and spawn its execution worker
    ///
    /// # Errors
    ///
    /// - [`HooksError::InvalidConfiguration`](crate::HooksError::InvalidConfiguration) for bad settings
    /// - [`HooksError::RuntimeError`](crate::HooksError::RuntimeError) outside a tokio runtime
    pub fn build(self) -> Result<HookEngine> {
        ConfigValidator::validate_engine(&self.config)?;

        let handlers = ActionHandlerRegistry::new();
        if self.builtin_handlers {
            register_builtin_handlers(&handlers)?;
        }
        for (action_type, handler) in self.handlers {
            handlers.register_arc(action_type, handler)?;
        }

        let notifier = Notifier::new();
        for observer in self.observers {
            notifier.subscribe(observer);
        }

        let cache = RuleCache::new();
        let executor = DefaultRuleExecutor::new(handlers.clone())
            .with_default_timeout(self.config.default_timeout())
            .with_retry_policy(self.config.retry.clone());
        let recorder = StatsRecorder::new(cache.clone(), self.store.clone());
        let queue = Arc::new(ExecutionQueue::start(
            Arc::new(executor),
            recorder,
            notifier.clone(),
        )?);

        Ok(HookEngine {
            manager: RuleManager::new(self.store, cache.clone(), notifier.clone()),
            dispatcher: Dispatcher::new(cache, queue.clone()),
            config: self.config,
            handlers,
            notifier,
            queue,
        })
    }
}

/// Event-triggered rule engine
#[derive(Debug)]
pub struct HookEngine {
    config: EngineConfig,
    handlers: ActionHandlerRegistry,
    notifier: Notifier,
    manager: RuleManager,
    dispatcher: Dispatcher,
    queue: Arc<ExecutionQueue>,
}

impl HookEngine {
    /// Start building an engine over a rule store
    pub fn builder(store: Arc<dyn RuleStore>) -> HookEngineBuilder {
        HookEngineBuilder {
            store,
            config: EngineConfig::default(),
            handlers: Vec::new(),
            observers: Vec::new(),
            builtin_handlers: false,
        }
    }

    /// Load enabled rules from the store when `load_on_start` is set
    ///
    /// Returns the number of rules loaded. A failing store is logged and
    /// leaves the engine with no rules.
    pub async fn start(&self) -> usize {
        if !self.config.load_on_start {
            info!("Skipping rule load");
            return 0;
        }
        self.manager.load_all().await
    }

    /// Engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rule management façade
    pub fn manager(&self) -> &RuleManager {
        &self.manager
    }

    /// Register (or replace) an action handler
    pub fn register_handler<H>(&self, action_type: impl Into<String>, handler: H) -> Result<()>
    where
        H: ActionHandler + 'static,
    {
        self.handlers.register(action_type, handler)
    }

    /// Add a lifecycle observer
    pub fn subscribe(&self, observer: Arc<dyn RuleObserver>) {
        self.notifier.subscribe(observer);
    }

    /// Report an event; returns how many rules were queued
    pub fn trigger(
        &self,
        trigger: TriggerKind,
        event_data: Value,
        overrides: ContextOverrides,
    ) -> Result<usize> {
        self.dispatcher.trigger(trigger, event_data, overrides)
    }

    /// Create a rule
    pub async fn create_rule(&self, rule: NewRule) -> Result<Rule> {
        self.manager.create(rule).await
    }

    /// Update a rule
    pub async fn update_rule(&self, rule_id: &str, update: RuleUpdate) -> Result<Rule> {
        self.manager.update(rule_id, update).await
    }

    /// Delete a rule
    pub async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        self.manager.delete(rule_id).await
    }

    /// Enable a rule
    pub async fn enable_rule(&self, rule_id: &str) -> Result<Rule> {
        self.manager.enable(rule_id).await
    }

    /// Disable a rule
    pub async fn disable_rule(&self, rule_id: &str) -> Result<Rule> {
        self.manager.disable(rule_id).await
    }

    /// A cached rule, including its current statistics
    pub fn get_rule(&self, rule_id: &str) -> Result<Rule> {
        self.manager.get(rule_id)
    }

    /// All cached rules
    pub fn list_rules(&self) -> Result<Vec<Rule>> {
        self.manager.list()
    }

    /// Most recent execution log records, newest first
    pub async fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        self.manager.store().recent_executions(limit).await
    }

    /// Wait until every execution queued before this call has finished
    pub async fn wait_idle(&self) -> Result<()> {
        self.queue.wait_idle().await
    }

    /// Stop accepting triggers and wait for queued executions to finish
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
        info!("Hook engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        error::HooksError,
        handlers::handler_fn,
        notify::EngineEvent,
        store::InMemoryRuleStore,
        types::{Action, ActionStatus, RuleStats},
    };

    fn audio_rule() -> NewRule {
        NewRule {
            name: "Auto-generate audio".to_string(),
            trigger: TriggerKind::PostPublished,
            actions: vec![Action::new("generate_audio").with_parameter("text", json!("{{content}}"))],
            ..NewRule::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_execution() {
        let store = Arc::new(InMemoryRuleStore::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let engine = HookEngine::builder(store.clone())
            .handler(
                "generate_audio",
                handler_fn(|params, _| async move { Ok(json!({"text": params["text"].clone()})) }),
            )
            .observer(Arc::new(move |event: &EngineEvent| {
                sink.lock().unwrap().push(event.name());
            }))
            .build()
            .unwrap();
        engine.start().await;

        let rule = engine.create_rule(audio_rule()).await.unwrap();
        let matched = engine
            .trigger(
                TriggerKind::PostPublished,
                json!({"content": "hello"}),
                ContextOverrides::default(),
            )
            .unwrap();
        engine.wait_idle().await.unwrap();

        assert_eq!(matched, 1);
        let cached = engine.get_rule(&rule.id).unwrap();
        assert_eq!(cached.stats.execution_count, 1);
        assert!((cached.stats.success_rate - 100.0).abs() < 1e-9);

        let log = store.executions();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].result.results[0].status, ActionStatus::Succeeded);
        assert_eq!(log[0].result.results[0].output, Some(json!({"text": "hello"})));
        assert_eq!(*events.lock().unwrap(), vec!["ruleCreated", "ruleExecuted"]);
    }

    /// In-memory store whose statistics writes take a while
    struct SlowStatsStore {
        inner: InMemoryRuleStore,
    }

    #[async_trait]
    impl RuleStore for SlowStatsStore {
        async fn load_enabled_rules(&self) -> Result<Vec<Rule>> {
            self.inner.load_enabled_rules().await
        }
        async fn list_rules(&self) -> Result<Vec<Rule>> {
            self.inner.list_rules().await
        }
        async fn get_rule(&self, rule_id: &str) -> Result<Rule> {
            self.inner.get_rule(rule_id).await
        }
        async fn insert_rule(&self, rule: NewRule) -> Result<Rule> {
            self.inner.insert_rule(rule).await
        }
        async fn update_rule(&self, rule_id: &str, update: &RuleUpdate) -> Result<Rule> {
            self.inner.update_rule(rule_id, update).await
        }
        async fn delete_rule(&self, rule_id: &str) -> Result<()> {
            self.inner.delete_rule(rule_id).await
        }
        async fn append_execution_log(&self, entry: &ExecutionLogEntry) -> Result<()> {
            self.inner.append_execution_log(entry).await
        }
        async fn update_rule_stats(&self, rule_id: &str, stats: &RuleStats) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.inner.update_rule_stats(rule_id, stats).await
        }
        async fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
            self.inner.recent_executions(limit).await
        }
    }

    #[tokio::test]
    async fn test_update_during_recording_keeps_stats() {
        let store = Arc::new(SlowStatsStore {
            inner: InMemoryRuleStore::new(),
        });
        let engine = HookEngine::builder(store.clone())
            .handler("generate_audio", handler_fn(|_, _| async { Ok(Value::Null) }))
            .build()
            .unwrap();
        let rule = engine.create_rule(audio_rule()).await.unwrap();

        engine
            .trigger(TriggerKind::PostPublished, json!({"content": "a"}), ContextOverrides::default())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let updated = engine
            .update_rule(
                &rule.id,
                RuleUpdate {
                    priority: Some(3),
                    ..RuleUpdate::default()
                },
            )
            .await
            .unwrap();
        engine.wait_idle().await.unwrap();

        assert_eq!(updated.priority, 3);
        assert_eq!(updated.stats.execution_count, 1);
        let cached = engine.get_rule(&rule.id).unwrap();
        assert_eq!(cached.priority, 3);
        assert_eq!(cached.stats.execution_count, 1);
        assert_eq!(store.get_rule(&rule.id).await.unwrap().stats.execution_count, 1);

        engine
            .trigger(TriggerKind::PostPublished, json!({"content": "b"}), ContextOverrides::default())
            .unwrap();
        engine.wait_idle().await.unwrap();
        assert_eq!(engine.get_rule(&rule.id).unwrap().stats.execution_count, 2);
        assert_eq!(store.get_rule(&rule.id).await.unwrap().stats.execution_count, 2);
    }

    #[tokio::test]
    async fn test_disabled_rule_is_not_triggered() {
        let engine = HookEngine::builder(Arc::new(InMemoryRuleStore::new()))
            .build()
            .unwrap();
        let rule = engine.create_rule(audio_rule()).await.unwrap();
        engine.disable_rule(&rule.id).await.unwrap();

        let matched = engine
            .trigger(TriggerKind::PostPublished, json!({}), ContextOverrides::default())
            .unwrap();
        assert_eq!(matched, 0);
    }

    #[tokio::test]
    async fn test_start_respects_load_on_start() {
        let store = Arc::new(InMemoryRuleStore::new());
        store.insert_rule(audio_rule()).await.unwrap();

        let eager = HookEngine::builder(store.clone()).build().unwrap();
        assert_eq!(eager.start().await, 1);

        let lazy = HookEngine::builder(store)
            .config(EngineConfig {
                load_on_start: false,
                ..EngineConfig::default()
            })
            .build()
            .unwrap();
        assert_eq!(lazy.start().await, 0);
        assert!(lazy.list_rules().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engines_are_independent() {
        let first = HookEngine::builder(Arc::new(InMemoryRuleStore::new()))
            .build()
            .unwrap();
        let second = HookEngine::builder(Arc::new(InMemoryRuleStore::new()))
            .build()
            .unwrap();

        first.create_rule(audio_rule()).await.unwrap();
        assert_eq!(first.list_rules().unwrap().len(), 1);
        assert!(second.list_rules().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_trigger() {
        let engine = HookEngine::builder(Arc::new(InMemoryRuleStore::new()))
            .build()
            .unwrap();
        engine.shutdown().await;

        let err = engine
            .trigger(TriggerKind::PostPublished, json!({}), ContextOverrides::default())
            .unwrap_err();
        assert!(matches!(err, HooksError::QueueClosed));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let result = HookEngine::builder(Arc::new(InMemoryRuleStore::new()))
            .config(EngineConfig {
                default_timeout_ms: 0,
                ..EngineConfig::default()
            })
            .build();
        assert!(matches!(result, Err(HooksError::InvalidConfiguration(_))));
    }
}
