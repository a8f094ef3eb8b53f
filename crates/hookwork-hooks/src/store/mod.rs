//! Persistent rule store
//!
//! The store is the source of truth for rule definitions and the home of the
//! append-only execution log. The engine only talks to it through the
//! [`RuleStore`] trait, so any backend (database, remote service, file) can
//! be plugged in.
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryRuleStore`]: everything in memory; handy for embedding and tests
//! - [`JsonFileRuleStore`]: `rules.json` plus `executions.jsonl` in a directory

pub mod file;
pub mod memory;

pub use file::JsonFileRuleStore;
pub use memory::InMemoryRuleStore;

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{ExecutionLogEntry, NewRule, Rule, RuleStats, RuleUpdate},
};

/// Backend holding rule definitions and the execution log
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All enabled rules, in store order
    async fn load_enabled_rules(&self) -> Result<Vec<Rule>>;

    /// Every rule, enabled or not, in store order
    async fn list_rules(&self) -> Result<Vec<Rule>>;

    /// A single rule
    ///
    /// # Errors
    ///
    /// [`HooksError::RuleNotFound`](crate::HooksError::RuleNotFound) if no rule has this id
    async fn get_rule(&self, rule_id: &str) -> Result<Rule>;

    /// Persist a new rule, assigning its id, timestamps and zeroed statistics
    async fn insert_rule(&self, rule: NewRule) -> Result<Rule>;

    /// Apply a partial update and return the stored result
    async fn update_rule(&self, rule_id: &str, update: &RuleUpdate) -> Result<Rule>;

    /// Delete a rule
    async fn delete_rule(&self, rule_id: &str) -> Result<()>;

    /// Append one record to the execution log
    async fn append_execution_log(&self, entry: &ExecutionLogEntry) -> Result<()>;

    /// Overwrite a rule's execution statistics
    async fn update_rule_stats(&self, rule_id: &str, stats: &RuleStats) -> Result<()>;

    /// The `limit` most recent execution log records, newest first
    async fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>>;
}
