//! Core data types for the hook engine
//!
//! This module defines rules, their conditions and actions, the context a
//! dispatch runs in, and the results and audit records it produces.
//!
//! # Examples
//!
//! A rule that generates audio for long published posts:
//!
//! ```ignore
//! use hookwork_hooks::*;
//! use serde_json::json;
//!
//! let rule = NewRule {
//!     name: "Auto-generate audio".to_string(),
//!     trigger: TriggerKind::PostPublished,
//!     conditions: vec![
//!         Condition::new("content", ConditionOperator::Exists, json!(true), ValueType::String),
//!         Condition::new("content.length", ConditionOperator::Gt, json!(100), ValueType::Number),
//!     ],
//!     actions: vec![Action::new("generate_audio").with_parameter("text", json!("{{content}}"))],
//!     ..NewRule::default()
//! };
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::TriggerKind;

/// Opaque key/value bag interpreted by an action handler
pub type Parameters = serde_json::Map<String, Value>;

/// Parameter keys that let a rule continue past a failed action
const CONTINUE_ON_FAILURE_KEYS: [&str; 2] = ["continueOnFailure", "continue_on_failure"];

/// A rule (hook): one trigger, ordered conditions, ordered actions
///
/// Rules are created, updated and deleted only through the `RuleManager`.
/// The statistics in [`RuleStats`] are written only by the stats recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier (UUID v4, assigned by the store)
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// What the rule is for
    #[serde(default)]
    pub description: String,

    /// Event kind that activates this rule
    pub trigger: TriggerKind,

    /// Conditions that must all hold (empty matches everything)
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Actions, executed in ascending `order`
    #[serde(default)]
    pub actions: Vec<Action>,

    /// Whether the rule takes part in matching
    pub enabled: bool,

    /// Lower runs first
    #[serde(default)]
    pub priority: i32,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last definition change
    pub updated_at: DateTime<Utc>,

    /// Who created the rule
    #[serde(default)]
    pub created_by: String,

    /// Running execution statistics
    #[serde(flatten)]
    pub stats: RuleStats,
}

/// Running execution statistics of a rule
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleStats {
    /// Number of completed executions
    #[serde(default)]
    pub execution_count: u64,

    /// Percentage (0-100) of successful executions
    #[serde(default)]
    pub success_rate: f64,

    /// When the rule last finished executing
    #[serde(default)]
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl RuleStats {
    /// Statistics after one more execution
    ///
    /// `success_rate` is the weighted running average over `execution_count`.
    pub fn record(&self, success: bool, executed_at: DateTime<Utc>) -> RuleStats {
        let old_count = self.execution_count as f64;
        let outcome = if success { 100.0 } else { 0.0 };
        let execution_count = self.execution_count + 1;

        RuleStats {
            execution_count,
            success_rate: (self.success_rate * old_count + outcome) / execution_count as f64,
            last_executed_at: Some(executed_at),
        }
    }
}

/// Input for creating a rule
///
/// Everything a user may set. The store assigns the id, timestamps and
/// zeroed statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
    /// Human-readable name
    pub name: String,

    /// What the rule is for
    #[serde(default)]
    pub description: String,

    /// Event kind that activates the rule
    pub trigger: TriggerKind,

    /// Conditions that must all hold
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Actions to execute
    #[serde(default)]
    pub actions: Vec<Action>,

    /// Whether the rule starts enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Lower runs first
    #[serde(default)]
    pub priority: i32,

    /// Who is creating the rule
    #[serde(default)]
    pub created_by: String,
}

fn default_enabled() -> bool {
    true
}

impl Default for NewRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            trigger: TriggerKind::CustomEvent,
            conditions: Vec::new(),
            actions: Vec::new(),
            enabled: true,
            priority: 0,
            created_by: String::new(),
        }
    }
}

impl NewRule {
    /// Materialize the rule with a store-assigned id and timestamp
    pub fn into_rule(self, id: String, now: DateTime<Utc>) -> Rule {
        Rule {
            id,
            name: self.name,
            description: self.description,
            trigger: self.trigger,
            conditions: self.conditions,
            actions: self.actions,
            enabled: self.enabled,
            priority: self.priority,
            created_at: now,
            updated_at: now,
            created_by: self.created_by,
            stats: RuleStats::default(),
        }
    }
}

/// Partial update of a rule definition
///
/// Only `Some` fields are applied. Statistics cannot be changed this way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl RuleUpdate {
    /// Update that only flips the enabled flag
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    /// Whether applying this update would change nothing
    pub fn is_empty(&self) -> bool {
        self == &RuleUpdate::default()
    }

    /// Apply the set fields to `rule` and bump `updated_at`
    pub fn apply_to(&self, rule: &mut Rule, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            rule.name = name.clone();
        }
        if let Some(description) = &self.description {
            rule.description = description.clone();
        }
        if let Some(trigger) = &self.trigger {
            rule.trigger = trigger.clone();
        }
        if let Some(conditions) = &self.conditions {
            rule.conditions = conditions.clone();
        }
        if let Some(actions) = &self.actions {
            rule.actions = actions.clone();
        }
        if let Some(enabled) = self.enabled {
            rule.enabled = enabled;
        }
        if let Some(priority) = self.priority {
            rule.priority = priority;
        }
        rule.updated_at = now;
    }
}

/// A single comparison test against event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-separated path into the event data (e.g. `post.author.id`)
    pub field: String,

    /// Comparison operator
    pub operator: ConditionOperator,

    /// Literal to compare against (ignored by `exists`/`not_exists`)
    #[serde(default)]
    pub value: Value,

    /// Type both sides are coerced to before comparing
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
}

impl Condition {
    /// Create a condition
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: Value,
        value_type: ValueType,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            value_type,
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    NotContains,
    Exists,
    NotExists,
    In,
    NotIn,
    /// Any operator name this engine does not know; never matches
    #[serde(other)]
    Unknown,
}

/// Declared type of a condition's operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Array,
}

/// One unit of work inside a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Handler name; must resolve in the handler registry
    #[serde(rename = "type")]
    pub action_type: String,

    /// Handler parameters; strings may contain `{{path}}` placeholders
    #[serde(default)]
    pub parameters: Parameters,

    /// Ascending execution order within the rule (need not be contiguous)
    #[serde(default)]
    pub order: i32,

    /// Number of retries after the first failed attempt
    #[serde(default)]
    pub retry_count: u32,

    /// Per-attempt timeout in milliseconds; 0 uses the engine default
    #[serde(default)]
    pub timeout_ms: u64,
}

impl Action {
    /// Create an action with no parameters, order 0, no retries and the
    /// default timeout
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            parameters: Parameters::new(),
            order: 0,
            retry_count: 0,
            timeout_ms: 0,
        }
    }

    /// Set a parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Set the execution order
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Set the retry budget
    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the per-attempt timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Whether a failure of this action lets the rule carry on
    pub fn continue_on_failure(&self) -> bool {
        CONTINUE_ON_FAILURE_KEYS
            .iter()
            .any(|key| self.parameters.get(*key).and_then(Value::as_bool) == Some(true))
    }

    /// Timeout for one attempt, falling back to `default` when unset
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        if self.timeout_ms == 0 {
            default
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }
}

/// Everything an action can know about the event that triggered it
///
/// Created once per `trigger` call and shared read-only by every rule the
/// call matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Event kind
    pub trigger: TriggerKind,

    /// Raw event payload
    pub event_data: Value,

    /// When the trigger was reported
    pub timestamp: DateTime<Utc>,

    /// Acting user, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Session the event belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Free-form caller metadata
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub metadata: Parameters,
}

impl ExecutionContext {
    /// Build a context, filling unset overrides with defaults
    pub fn new(trigger: TriggerKind, event_data: Value, overrides: ContextOverrides) -> Self {
        Self {
            trigger,
            event_data,
            timestamp: overrides.timestamp.unwrap_or_else(Utc::now),
            user_id: overrides.user_id,
            session_id: overrides.session_id,
            metadata: overrides.metadata,
        }
    }
}

/// Caller-supplied parts of an [`ExecutionContext`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextOverrides {
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub metadata: Parameters,
}

impl ContextOverrides {
    /// Set the acting user
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Pin the context timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Status of one action within a rule execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Handler returned successfully
    Succeeded,

    /// Handler failed (or could not be found) after all attempts
    Failed,

    /// Last attempt hit the action timeout
    TimedOut,

    /// Not run because an earlier action halted the rule
    Skipped,
}

/// Result of one action within a rule execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Handler name
    pub action_type: String,

    /// Declared order
    pub order: i32,

    /// Final status
    pub status: ActionStatus,

    /// Attempts made (0 when skipped)
    pub attempts: u32,

    /// Handler output on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    /// Error of the last attempt on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall time across all attempts, including backoff
    pub duration_ms: u64,
}

/// Terminal state of one rule execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Succeeded,
    PartiallyFailed,
    Failed,
}

/// Aggregate result of executing one rule for one trigger
///
/// Produced once and never mutated afterwards; persisted verbatim in the
/// execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// False when a failing action halted the rule
    pub success: bool,

    /// Actions that succeeded
    pub executed_actions: usize,

    /// Actions that failed or timed out
    pub failed_actions: usize,

    /// Wall time of the whole rule
    pub duration_ms: u64,

    /// One entry per action, in execution order
    pub results: Vec<ActionOutcome>,

    /// Error messages of failed actions
    pub errors: Vec<String>,
}

impl ExecutionResult {
    /// Terminal state this result represents
    pub fn outcome(&self) -> RuleOutcome {
        match (self.success, self.failed_actions, self.executed_actions) {
            (true, 0, _) => RuleOutcome::Succeeded,
            (false, _, 0) => RuleOutcome::Failed,
            _ => RuleOutcome::PartiallyFailed,
        }
    }
}

/// Immutable audit record of one rule execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    /// Log entry id (UUID v4)
    pub id: String,

    /// Executed rule
    pub rule_id: String,

    /// Rule name at execution time
    pub rule_name: String,

    /// Event kind
    pub trigger: TriggerKind,

    /// Raw event payload
    pub event_data: Value,

    /// Full context
    pub context: ExecutionContext,

    /// Full result
    pub result: ExecutionResult,

    /// Copy of `result.success`
    pub success: bool,

    /// Copy of `result.duration_ms`
    pub duration_ms: u64,

    /// When the execution finished
    pub executed_at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    /// Build the audit record for a finished execution
    pub fn new(
        rule: &Rule,
        context: &ExecutionContext,
        result: &ExecutionResult,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            trigger: context.trigger.clone(),
            event_data: context.event_data.clone(),
            context: context.clone(),
            result: result.clone(),
            success: result.success,
            duration_ms: result.duration_ms,
            executed_at,
        }
    }
}
