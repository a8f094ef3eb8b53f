//! End-to-End Test Suite: rule workflows from trigger to audit log
//!
//! Drives a complete engine (store, cache, dispatcher, executor, recorder and
//! observers) through the public API only.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use hookwork_hooks::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn long_content_rule(action: &str) -> NewRule {
    NewRule {
        name: "Long resource".to_string(),
        trigger: TriggerKind::ResourcePublished,
        conditions: vec![
            Condition::new("content", ConditionOperator::Exists, Value::Null, ValueType::String),
            Condition::new(
                "content.length",
                ConditionOperator::Gt,
                json!(100),
                ValueType::Number,
            ),
        ],
        actions: vec![Action::new(action)],
        ..NewRule::default()
    }
}

fn ok_handler() -> impl ActionHandler {
    handler_fn(|_, _| async { Ok(json!("done")) })
}

fn failing_handler() -> impl ActionHandler {
    handler_fn(|_, _| async { Err(HooksError::ExecutionFailed("remote error".to_string())) })
}

/// Published resources with long content run the rule and leave one audit row;
/// short content matches nothing and leaves no trace.
#[tokio::test]
async fn test_published_resource_workflow() {
    let store = Arc::new(InMemoryRuleStore::new());
    let engine = HookEngine::builder(store.clone())
        .handler("ok", ok_handler())
        .build()
        .unwrap();
    engine.start().await;
    let rule = engine.create_rule(long_content_rule("ok")).await.unwrap();

    let matched = engine
        .trigger(
            TriggerKind::ResourcePublished,
            json!({"content": "x".repeat(150)}),
            ContextOverrides::default(),
        )
        .unwrap();
    engine.wait_idle().await.unwrap();
    assert_eq!(matched, 1);
    assert_eq!(store.executions().len(), 1);

    let matched = engine
        .trigger(
            TriggerKind::ResourcePublished,
            json!({"content": "short"}),
            ContextOverrides::default(),
        )
        .unwrap();
    engine.wait_idle().await.unwrap();
    assert_eq!(matched, 0);
    assert_eq!(store.executions().len(), 1);

    let cached = engine.get_rule(&rule.id).unwrap();
    assert_eq!(cached.stats.execution_count, 1);
    assert_eq!(store.get_rule(&rule.id).await.unwrap().stats, cached.stats);
}

/// A failing rule halts only itself; later rules of the same trigger still run.
#[tokio::test]
async fn test_failure_is_isolated_to_its_rule() {
    let store = Arc::new(InMemoryRuleStore::new());
    let engine = HookEngine::builder(store.clone())
        .handler("ok", ok_handler())
        .handler("fail", failing_handler())
        .build()
        .unwrap();

    let failing = engine
        .create_rule(NewRule {
            name: "Failing first".to_string(),
            trigger: TriggerKind::MediaUploaded,
            priority: 1,
            actions: vec![
                Action::new("fail").with_order(1),
                Action::new("ok").with_order(2),
            ],
            ..NewRule::default()
        })
        .await
        .unwrap();
    let healthy = engine
        .create_rule(NewRule {
            name: "Healthy second".to_string(),
            trigger: TriggerKind::MediaUploaded,
            priority: 2,
            actions: vec![Action::new("ok")],
            ..NewRule::default()
        })
        .await
        .unwrap();

    let matched = engine
        .trigger(TriggerKind::MediaUploaded, json!({}), ContextOverrides::default())
        .unwrap();
    engine.wait_idle().await.unwrap();
    assert_eq!(matched, 2);

    let log = store.executions();
    assert_eq!(log.len(), 2);

    assert_eq!(log[0].rule_id, failing.id);
    assert_eq!(log[0].result.outcome(), RuleOutcome::Failed);
    assert_eq!(log[0].result.results[1].status, ActionStatus::Skipped);
    assert_eq!(log[0].result.errors, vec!["fail: Action execution failed: remote error"]);

    assert_eq!(log[1].rule_id, healthy.id);
    assert_eq!(log[1].result.outcome(), RuleOutcome::Succeeded);

    assert_eq!(engine.get_rule(&failing.id).unwrap().stats.success_rate, 0.0);
    assert_eq!(engine.get_rule(&healthy.id).unwrap().stats.success_rate, 100.0);
}

/// A handler that never resolves is cut off at the action timeout.
#[tokio::test]
async fn test_hung_handler_times_out() {
    let store = Arc::new(InMemoryRuleStore::new());
    let engine = HookEngine::builder(store.clone())
        .handler(
            "hang",
            handler_fn(|_, _| async {
                std::future::pending::<()>().await;
                Ok(Value::Null)
            }),
        )
        .build()
        .unwrap();
    engine
        .create_rule(NewRule {
            name: "Hangs".to_string(),
            trigger: TriggerKind::ApiCall,
            actions: vec![Action::new("hang").with_timeout_ms(50)],
            ..NewRule::default()
        })
        .await
        .unwrap();

    let started = Instant::now();
    engine
        .trigger(TriggerKind::ApiCall, json!({}), ContextOverrides::default())
        .unwrap();
    engine.wait_idle().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    let log = store.executions();
    let outcome = &log[0].result.results[0];
    assert_eq!(outcome.status, ActionStatus::TimedOut);
    assert_eq!(outcome.error.as_deref(), Some("Action timed out after 50ms"));
    assert!(!log[0].success);
}

/// Parameters see event data, metadata and context fields.
#[tokio::test]
async fn test_parameters_are_templated_from_context() {
    let store = Arc::new(InMemoryRuleStore::new());
    let engine = HookEngine::builder(store.clone())
        .handler("echo", handler_fn(|params, _| async move { Ok(params) }))
        .build()
        .unwrap();
    engine
        .create_rule(NewRule {
            name: "Welcome".to_string(),
            trigger: TriggerKind::UserRegistered,
            actions: vec![Action::new("echo")
                .with_parameter("greeting", json!("Hello {{profile.name}} via {{source}}"))
                .with_parameter("user", json!("{{user_id}}"))
                .with_parameter("tags", json!("{{profile.tags}}"))],
            ..NewRule::default()
        })
        .await
        .unwrap();

    engine
        .trigger(
            TriggerKind::UserRegistered,
            json!({"profile": {"name": "Ada", "tags": ["beta", "admin"]}}),
            ContextOverrides::default()
                .with_user("u-17")
                .with_metadata("source", json!("signup-form")),
        )
        .unwrap();
    engine.wait_idle().await.unwrap();

    let output = store.executions()[0].result.results[0].output.clone();
    assert_eq!(
        output,
        Some(json!({
            "greeting": "Hello Ada via signup-form",
            "user": "u-17",
            "tags": ["beta", "admin"],
        }))
    );
}

/// Observers see executions through a channel.
#[tokio::test]
async fn test_channel_observer_receives_executions() {
    let (observer, mut events) = ChannelObserver::new(16);
    let engine = HookEngine::builder(Arc::new(InMemoryRuleStore::new()))
        .handler("ok", ok_handler())
        .observer(Arc::new(observer))
        .build()
        .unwrap();
    let rule = engine.create_rule(long_content_rule("ok")).await.unwrap();

    engine
        .trigger(
            TriggerKind::ResourcePublished,
            json!({"content": "y".repeat(101)}),
            ContextOverrides::default(),
        )
        .unwrap();
    engine.wait_idle().await.unwrap();

    assert_eq!(events.recv().await.unwrap().name(), "ruleCreated");
    match events.recv().await.unwrap() {
        EngineEvent::RuleExecuted { rule: executed, result, .. } => {
            assert_eq!(executed.id, rule.id);
            assert!(result.success);
        }
        other => panic!("Expected RuleExecuted, got {}", other.name()),
    }
}

/// Store with no rules that refuses every write
struct ReadOnlyStore;

#[async_trait]
impl RuleStore for ReadOnlyStore {
    async fn load_enabled_rules(&self) -> Result<Vec<Rule>> {
        Err(HooksError::StorageError("connection refused".to_string()))
    }
    async fn list_rules(&self) -> Result<Vec<Rule>> {
        Ok(Vec::new())
    }
    async fn get_rule(&self, rule_id: &str) -> Result<Rule> {
        Err(HooksError::RuleNotFound(rule_id.to_string()))
    }
    async fn insert_rule(&self, _rule: NewRule) -> Result<Rule> {
        Err(HooksError::StorageError("read-only".to_string()))
    }
    async fn update_rule(&self, _rule_id: &str, _update: &RuleUpdate) -> Result<Rule> {
        Err(HooksError::StorageError("read-only".to_string()))
    }
    async fn delete_rule(&self, _rule_id: &str) -> Result<()> {
        Err(HooksError::StorageError("read-only".to_string()))
    }
    async fn append_execution_log(&self, _entry: &ExecutionLogEntry) -> Result<()> {
        Err(HooksError::StorageError("read-only".to_string()))
    }
    async fn update_rule_stats(&self, _rule_id: &str, _stats: &RuleStats) -> Result<()> {
        Err(HooksError::StorageError("read-only".to_string()))
    }
    async fn recent_executions(&self, _limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        Ok(Vec::new())
    }
}

/// An unreachable store degrades to an engine with no rules.
#[tokio::test]
async fn test_unavailable_store_degrades_gracefully() {
    let engine = HookEngine::builder(Arc::new(ReadOnlyStore))
        .handler("ok", ok_handler())
        .build()
        .unwrap();

    assert_eq!(engine.start().await, 0);
    assert_eq!(
        engine
            .trigger(TriggerKind::PostPublished, json!({}), ContextOverrides::default())
            .unwrap(),
        0
    );

    let err = engine.create_rule(long_content_rule("ok")).await.unwrap_err();
    assert!(matches!(err, HooksError::StorageError(_)));
    assert!(engine.list_rules().unwrap().is_empty());
}

/// Rules and history persist in the store directory.
#[tokio::test]
async fn test_file_store_round_trip() {
    let dir = TempDir::new().unwrap();
    {
        let engine = HookEngine::builder(Arc::new(JsonFileRuleStore::new(dir.path())))
            .handler("ok", ok_handler())
            .build()
            .unwrap();
        engine.create_rule(long_content_rule("ok")).await.unwrap();
        engine
            .trigger(
                TriggerKind::ResourcePublished,
                json!({"content": "z".repeat(120)}),
                ContextOverrides::default(),
            )
            .unwrap();
        engine.shutdown().await;
    }

    assert!(dir.path().join("rules.json").exists());
    assert!(dir.path().join("executions.jsonl").exists());

    let engine = HookEngine::builder(Arc::new(JsonFileRuleStore::new(dir.path())))
        .build()
        .unwrap();
    assert_eq!(engine.start().await, 1);
    let history = engine.recent_executions(5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].rule_name, "Long resource");
}
