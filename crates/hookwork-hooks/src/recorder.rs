//! Execution bookkeeping
//!
//! After a rule ran, its statistics are folded into the cached rule and
//! persisted, and an immutable execution log record is appended. Action side
//! effects have already happened at this point, so persistence failures are
//! logged and never undo or re-queue anything.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::{
    cache::RuleCache,
    store::RuleStore,
    types::{ExecutionContext, ExecutionLogEntry, ExecutionResult, Rule},
};

/// Updates rule statistics and appends execution log records
#[derive(Clone)]
pub struct StatsRecorder {
    cache: RuleCache,
    store: Arc<dyn RuleStore>,
}

impl StatsRecorder {
    /// Create a recorder writing to `cache` and `store`
    pub fn new(cache: RuleCache, store: Arc<dyn RuleStore>) -> Self {
        Self { cache, store }
    }

    /// Record one finished rule execution
    ///
    /// The log record is appended even when the rule has been removed from
    /// the cache in the meantime; only the statistics update is skipped.
    pub async fn record(&self, rule: &Rule, context: &ExecutionContext, result: &ExecutionResult) {
        let executed_at = Utc::now();

        match self.cache.record_execution(&rule.id, result.success, executed_at) {
            Ok(Some(stats)) => {
                debug!(
                    rule_id = %rule.id,
                    execution_count = stats.execution_count,
                    success_rate = stats.success_rate,
                    "Updated rule statistics"
                );
                if let Err(e) = self.store.update_rule_stats(&rule.id, &stats).await {
                    error!(rule_id = %rule.id, error = %e, "Failed to persist rule statistics");
                }
            }
            Ok(None) => {
                warn!(rule_id = %rule.id, "Rule no longer cached, skipping statistics");
            }
            Err(e) => {
                error!(rule_id = %rule.id, error = %e, "Failed to update rule statistics");
            }
        }

        let entry = ExecutionLogEntry::new(rule, context, result, executed_at);
        if let Err(e) = self.store.append_execution_log(&entry).await {
            error!(rule_id = %rule.id, error = %e, "Failed to append execution log");
        }
    }
}

impl std::fmt::Debug for StatsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsRecorder")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
