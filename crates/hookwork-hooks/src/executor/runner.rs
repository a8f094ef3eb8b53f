//! Rule execution: ordered actions with timeout, retry and backoff

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{retry::RetryPolicy, substitution::VariableSubstitutor, RuleExecutor};
use crate::{
    error::{HooksError, Result},
    handlers::{ActionHandler, ActionHandlerRegistry},
    types::{Action, ActionOutcome, ActionStatus, ExecutionContext, ExecutionResult, Rule},
};

/// Default timeout for actions that do not set one
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default implementation of [`RuleExecutor`]
///
/// Each attempt runs the handler in its own task raced against the action
/// timeout; a timed-out attempt is aborted. The retry budget is read from the
/// action on every execution and never written back, so a stored rule always
/// starts a dispatch with its full budget.
#[derive(Debug, Clone)]
pub struct DefaultRuleExecutor {
    handlers: ActionHandlerRegistry,
    default_timeout: Duration,
    retry: RetryPolicy,
}

impl DefaultRuleExecutor {
    /// Create an executor over a handler registry
    pub fn new(handlers: ActionHandlerRegistry) -> Self {
        Self {
            handlers,
            default_timeout: DEFAULT_ACTION_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the timeout used by actions without their own
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the backoff schedule between attempts
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The handler registry this executor resolves action types against
    pub fn handlers(&self) -> &ActionHandlerRegistry {
        &self.handlers
    }

    /// Run one attempt, bounded by `timeout`
    async fn attempt(
        handler: Arc<dyn ActionHandler>,
        params: Value,
        context: Arc<ExecutionContext>,
        timeout: Duration,
    ) -> Result<Value> {
        let task = tokio::spawn(async move { handler.handle(params, context).await });
        let abort = task.abort_handle();

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(e @ (HooksError::ExecutionFailed(_) | HooksError::Timeout(_))))) => Err(e),
            Ok(Ok(Err(other))) => Err(HooksError::ExecutionFailed(other.to_string())),
            Ok(Err(join_error)) => Err(HooksError::ExecutionFailed(format!(
                "Action handler panicked: {}",
                join_error
            ))),
            Err(_) => {
                abort.abort();
                Err(HooksError::Timeout(timeout.as_millis() as u64))
            }
        }
    }
}

fn finished(
    action: &Action,
    result: Result<Value>,
    attempts: u32,
    start: Instant,
) -> ActionOutcome {
    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(output) => ActionOutcome {
            action_type: action.action_type.clone(),
            order: action.order,
            status: ActionStatus::Succeeded,
            attempts,
            output: Some(output),
            error: None,
            duration_ms,
        },
        Err(e) => ActionOutcome {
            action_type: action.action_type.clone(),
            order: action.order,
            status: if matches!(e, HooksError::Timeout(_)) {
                ActionStatus::TimedOut
            } else {
                ActionStatus::Failed
            },
            attempts,
            output: None,
            error: Some(e.to_string()),
            duration_ms,
        },
    }
}

fn skipped(action: &Action) -> ActionOutcome {
    ActionOutcome {
        action_type: action.action_type.clone(),
        order: action.order,
        status: ActionStatus::Skipped,
        attempts: 0,
        output: None,
        error: None,
        duration_ms: 0,
    }
}

#[async_trait]
impl RuleExecutor for DefaultRuleExecutor {
    async fn execute_rule(&self, rule: &Rule, context: Arc<ExecutionContext>) -> ExecutionResult {
        let start = Instant::now();

        debug!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            trigger = %context.trigger,
            action_count = rule.actions.len(),
            "Starting rule execution"
        );

        let mut actions: Vec<&Action> = rule.actions.iter().collect();
        actions.sort_by_key(|action| action.order);

        let mut success = true;
        let mut executed_actions = 0;
        let mut failed_actions = 0;
        let mut results = Vec::with_capacity(actions.len());
        let mut errors = Vec::new();

        for action in actions {
            if !success {
                results.push(skipped(action));
                continue;
            }

            let outcome = self.execute_action(action, context.clone()).await;

            if outcome.status == ActionStatus::Succeeded {
                executed_actions += 1;
            } else {
                failed_actions += 1;
                errors.push(format!(
                    "{}: {}",
                    action.action_type,
                    outcome.error.as_deref().unwrap_or("unknown error")
                ));

                if action.continue_on_failure() {
                    debug!(
                        rule_id = %rule.id,
                        action_type = %action.action_type,
                        "Action failed, continuing"
                    );
                } else {
                    success = false;
                }
            }

            results.push(outcome);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        if success {
            info!(
                rule_id = %rule.id,
                executed_actions = executed_actions,
                failed_actions = failed_actions,
                duration_ms = duration_ms,
                "Rule executed"
            );
        } else {
            error!(
                rule_id = %rule.id,
                executed_actions = executed_actions,
                failed_actions = failed_actions,
                duration_ms = duration_ms,
                "Rule execution halted by failed action"
            );
        }

        ExecutionResult {
            success,
            executed_actions,
            failed_actions,
            duration_ms,
            results,
            errors,
        }
    }

    async fn execute_action(&self, action: &Action, context: Arc<ExecutionContext>) -> ActionOutcome {
        let start = Instant::now();

        let handler = match self.handlers.resolve(&action.action_type) {
            Ok(handler) => handler,
            Err(e) => {
                error!(action_type = %action.action_type, error = %e, "Cannot resolve action");
                return finished(action, Err(e), 0, start);
            }
        };

        let params = match VariableSubstitutor::substitute_json(
            &Value::Object(action.parameters.clone()),
            &context,
        ) {
            Ok(params) => params,
            Err(e) => {
                error!(action_type = %action.action_type, error = %e, "Cannot resolve action parameters");
                return finished(action, Err(e), 0, start);
            }
        };

        let timeout = action.effective_timeout(self.default_timeout);
        let mut retries_left = action.retry_count;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let result =
                Self::attempt(handler.clone(), params.clone(), context.clone(), timeout).await;

            match result {
                Ok(output) => {
                    debug!(
                        action_type = %action.action_type,
                        attempts = attempts,
                        "Action succeeded"
                    );
                    return finished(action, Ok(output), attempts, start);
                }
                Err(e) if e.is_retryable() && retries_left > 0 => {
                    retries_left -= 1;
                    let delay = self.retry.delay_for(attempts - 1);
                    warn!(
                        action_type = %action.action_type,
                        attempt = attempts,
                        retries_left = retries_left,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Action failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        action_type = %action.action_type,
                        attempts = attempts,
                        error = %e,
                        "Action failed"
                    );
                    return finished(action, Err(e), attempts, start);
                }
            }
        }
    }
}
