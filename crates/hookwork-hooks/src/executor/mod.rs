//! Rule execution
//!
//! - [`condition`]: decides whether a rule applies to an event
//! - [`substitution`]: resolves `{{placeholders}}` in action parameters
//! - [`retry`]: backoff schedule between attempts
//! - [`runner`]: runs a rule's actions in order with timeout and retry

pub mod condition;
pub mod retry;
pub mod runner;
pub mod substitution;

use std::sync::Arc;

use async_trait::async_trait;

pub use condition::ConditionEvaluator;
pub use retry::RetryPolicy;
pub use runner::{DefaultRuleExecutor, DEFAULT_ACTION_TIMEOUT};
pub use substitution::VariableSubstitutor;

use crate::types::{Action, ActionOutcome, ExecutionContext, ExecutionResult, Rule};

/// Executes matched rules
///
/// Failures never escape as errors: they are reported in the returned
/// [`ExecutionResult`] / [`ActionOutcome`] so one failing rule cannot stop the
/// dispatch worker.
#[async_trait]
pub trait RuleExecutor: Send + Sync {
    /// Run every action of `rule` in ascending `order`
    ///
    /// A failed action halts the remaining ones unless its parameters set
    /// `continueOnFailure`.
    async fn execute_rule(&self, rule: &Rule, context: Arc<ExecutionContext>) -> ExecutionResult;

    /// Run a single action, retrying while it has budget left
    async fn execute_action(&self, action: &Action, context: Arc<ExecutionContext>)
        -> ActionOutcome;
}
