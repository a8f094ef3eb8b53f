//! Trigger dispatching
//!
//! [`Dispatcher::trigger`] turns one reported event into queued rule
//! executions:
//!
//! 1. Build the execution context once
//! 2. Select cached rules that are enabled and listen for the trigger
//! 3. Keep the rules whose conditions all hold
//! 4. Sort by ascending priority (ties keep cache order)
//! 5. Queue them for the single execution worker
//!
//! The call returns as soon as the rules are queued; it reports how many
//! rules matched, never whether they succeeded.

pub mod queue;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

pub use queue::ExecutionQueue;

use crate::{
    cache::RuleCache,
    error::{HooksError, Result},
    events::TriggerKind,
    executor::ConditionEvaluator,
    types::{ContextOverrides, ExecutionContext, Rule},
};

/// Matches events against cached rules and queues the matches
#[derive(Debug, Clone)]
pub struct Dispatcher {
    cache: RuleCache,
    queue: Arc<ExecutionQueue>,
}

impl Dispatcher {
    /// Create a dispatcher over a cache and a running queue
    pub fn new(cache: RuleCache, queue: Arc<ExecutionQueue>) -> Self {
        Self { cache, queue }
    }

    /// Report an event
    ///
    /// # Returns
    ///
    /// The number of rules queued for execution
    ///
    /// # Errors
    ///
    /// [`HooksError::QueueClosed`] once the engine has shut down.
    pub fn trigger(
        &self,
        trigger: TriggerKind,
        event_data: Value,
        overrides: ContextOverrides,
    ) -> Result<usize> {
        if !self.queue.is_open() {
            return Err(HooksError::QueueClosed);
        }

        let context = Arc::new(ExecutionContext::new(trigger, event_data, overrides));
        let matched = self.matching_rules(&context)?;
        let count = matched.len();

        if count == 0 {
            debug!(trigger = %context.trigger, "No rules matched");
            return Ok(0);
        }

        info!(
            trigger = %context.trigger,
            matched = count,
            "Queueing matched rules"
        );

        self.queue.enqueue(matched, context)?;
        Ok(count)
    }

    /// Rules that would run for `context`, in execution order
    pub fn matching_rules(&self, context: &ExecutionContext) -> Result<Vec<Rule>> {
        let mut matched: Vec<Rule> = self
            .cache
            .candidates(&context.trigger)?
            .into_iter()
            .filter(|rule| {
                let applies = ConditionEvaluator::matches(&rule.conditions, &context.event_data);
                if !applies {
                    debug!(rule_id = %rule.id, "Conditions not met");
                }
                applies
            })
            .collect();

        // Stable: equal priorities keep cache order
        matched.sort_by_key(|rule| rule.priority);
        Ok(matched)
    }
}
