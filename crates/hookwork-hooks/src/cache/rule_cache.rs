//! In-memory rule cache implementation

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::{
    error::{HooksError, Result},
    events::TriggerKind,
    types::{Rule, RuleStats},
};

/// Read-optimized mirror of the rule store
///
/// Rules are kept in insertion order; replacing a rule keeps its position.
/// Readers always see either the old or the new version of a rule, never a
/// mix, because every mutation happens under the write lock.
#[derive(Debug, Clone, Default)]
pub struct RuleCache {
    rules: Arc<RwLock<Vec<Rule>>>,
}

impl RuleCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole content
    pub fn replace_all(&self, rules: Vec<Rule>) -> Result<()> {
        let mut cached = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        *cached = rules;
        Ok(())
    }

    /// Insert a rule, or replace the cached rule with the same id in place
    pub fn upsert(&self, rule: Rule) -> Result<()> {
        let mut rules = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        match rules.iter_mut().find(|cached| cached.id == rule.id) {
            Some(cached) => *cached = rule,
            None => rules.push(rule),
        }
        Ok(())
    }

    /// Replace a rule's definition, keeping the statistics already cached
    ///
    /// Statistics are owned by the execution recorder, so a definition read
    /// back from the store never overwrites them. Returns the rule as cached.
    pub fn replace_definition(&self, mut rule: Rule) -> Result<Rule> {
        let mut rules = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        match rules.iter_mut().find(|cached| cached.id == rule.id) {
            Some(cached) => {
                rule.stats = cached.stats.clone();
                *cached = rule.clone();
            }
            None => rules.push(rule.clone()),
        }
        Ok(rule)
    }

    /// Remove a rule, returning whether it was cached
    pub fn remove(&self, rule_id: &str) -> Result<bool> {
        let mut rules = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        let before = rules.len();
        rules.retain(|rule| rule.id != rule_id);
        Ok(rules.len() != before)
    }

    /// Get a rule by id
    pub fn get(&self, rule_id: &str) -> Result<Rule> {
        let rules = self
            .rules
            .read()
            .map_err(|e| HooksError::StorageError(format!("Failed to acquire read lock: {}", e)))?;

        rules
            .iter()
            .find(|rule| rule.id == rule_id)
            .cloned()
            .ok_or_else(|| HooksError::RuleNotFound(rule_id.to_string()))
    }

    /// All cached rules in cache order
    pub fn list(&self) -> Result<Vec<Rule>> {
        let rules = self
            .rules
            .read()
            .map_err(|e| HooksError::StorageError(format!("Failed to acquire read lock: {}", e)))?;

        Ok(rules.clone())
    }

    /// Enabled rules listening for `trigger`, in cache order
    pub fn candidates(&self, trigger: &TriggerKind) -> Result<Vec<Rule>> {
        let rules = self
            .rules
            .read()
            .map_err(|e| HooksError::StorageError(format!("Failed to acquire read lock: {}", e)))?;

        Ok(rules
            .iter()
            .filter(|rule| rule.enabled && &rule.trigger == trigger)
            .cloned()
            .collect())
    }

    /// Fold one execution into a cached rule's statistics
    ///
    /// The read-modify-write happens under the write lock, so concurrent
    /// recordings never lose an update. Returns `None` when the rule is no
    /// longer cached.
    pub fn record_execution(
        &self,
        rule_id: &str,
        success: bool,
        executed_at: DateTime<Utc>,
    ) -> Result<Option<RuleStats>> {
        let mut rules = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(rules.iter_mut().find(|rule| rule.id == rule_id).map(|rule| {
            rule.stats = rule.stats.record(success, executed_at);
            rule.stats.clone()
        }))
    }

    /// Number of cached rules
    pub fn len(&self) -> usize {
        self.rules.read().map(|rules| rules.len()).unwrap_or(0)
    }

    /// Whether the cache holds no rules
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
