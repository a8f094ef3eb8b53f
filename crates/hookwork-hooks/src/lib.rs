//! Hookwork Hooks System
//!
//! Event-triggered automation: named events fire user-defined rules whose
//! conditions are checked against the event payload and whose actions run in
//! order through pluggable handlers.
//!
//! # Overview
//!
//! A rule listens for one trigger kind (`post.published`, `media.uploaded`,
//! ...), holds a list of conditions over the event data and an ordered list
//! of actions. When an event is reported, every enabled rule for its trigger
//! whose conditions all hold is queued and executed in the background. Each
//! execution updates the rule's statistics and appends an audit record.
//!
//! # Architecture
//!
//! 1. **Rule Cache** (`cache`): In-memory copy of the enabled rules
//! 2. **Rule Manager** (`manager`): Validated CRUD over the store and cache
//! 3. **Dispatcher** (`dispatcher`): Matches events and feeds the execution queue
//! 4. **Executor** (`executor`): Conditions, templates, retries and timeouts
//! 5. **Handlers** (`handlers`): Named action implementations
//! 6. **Recorder** (`recorder`): Statistics and execution log
//! 7. **Store** (`store`): Persistence seam (in-memory and JSON files)
//!
//! [`HookEngine`] wires these together; nothing is process-global.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use hookwork_hooks::{
//!     handler_fn, Action, Condition, ConditionOperator, ContextOverrides, HookEngine,
//!     InMemoryRuleStore, NewRule, TriggerKind, ValueType,
//! };
//! use serde_json::json;
//!
//! let engine = HookEngine::builder(Arc::new(InMemoryRuleStore::new()))
//!     .handler("notify", handler_fn(|params, _ctx| async move { Ok(params) }))
//!     .build()?;
//! engine.start().await;
//!
//! engine
//!     .create_rule(NewRule {
//!         name: "Announce long posts".to_string(),
//!         trigger: TriggerKind::PostPublished,
//!         conditions: vec![Condition::new(
//!             "content.length",
//!             ConditionOperator::Gt,
//!             json!(100),
//!             ValueType::Number,
//!         )],
//!         actions: vec![Action::new("notify").with_parameter("post", json!("{{id}}"))],
//!         ..NewRule::default()
//!     })
//!     .await?;
//!
//! engine.trigger(
//!     TriggerKind::PostPublished,
//!     json!({"id": 7, "content": "..."}),
//!     ContextOverrides::default(),
//! )?;
//! engine.wait_idle().await?;
//! ```
//!
//! # Configuration
//!
//! Engine settings and seed rules live in `hookwork.yaml`:
//!
//! ```yaml
//! engine:
//!   default_timeout_ms: 30000
//!   retry:
//!     initial_delay_ms: 1000
//!     multiplier: 2.0
//!     max_delay_ms: 30000
//! rules:
//!   - name: "Log publications"
//!     trigger: "post.published"
//!     actions:
//!       - type: "log"
//!         parameters:
//!           message: "Published {{id}}"
//! ```
//!
//! # Variable Substitution
//!
//! String parameters may reference `{{path}}` placeholders. Paths resolve
//! against the event data, then the context metadata, then `trigger`,
//! `timestamp`, `user_id` and `session_id`.
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `std::result::Result<T, HooksError>`. Failures inside background
//! executions never reach the caller of `trigger`; they are captured in the
//! execution result and the log.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod handlers;
pub mod manager;
pub mod notify;
pub mod recorder;
pub mod store;
pub mod types;

// Re-export public types
pub use cache::RuleCache;
pub use cli::{RuleCli, RuleCommand};
pub use config::{ConfigLoader, ConfigValidator, EngineConfig, HookworkConfig};
pub use dispatcher::{Dispatcher, ExecutionQueue};
pub use engine::{HookEngine, HookEngineBuilder};
pub use error::{HooksError, Result};
pub use events::TriggerKind;
pub use executor::{
    ConditionEvaluator, DefaultRuleExecutor, RetryPolicy, RuleExecutor, VariableSubstitutor,
};
pub use handlers::{handler_fn, ActionHandler, ActionHandlerRegistry};
pub use manager::RuleManager;
pub use notify::{ChannelObserver, EngineEvent, Notifier, RuleObserver};
pub use recorder::StatsRecorder;
pub use store::{InMemoryRuleStore, JsonFileRuleStore, RuleStore};
pub use types::{
    Action, ActionOutcome, ActionStatus, Condition, ConditionOperator, ContextOverrides,
    ExecutionContext, ExecutionLogEntry, ExecutionResult, NewRule, Parameters, Rule, RuleOutcome,
    RuleStats, RuleUpdate, ValueType,
};
