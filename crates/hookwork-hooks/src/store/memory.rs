//! In-memory rule store implementation

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::RuleStore;
use crate::{
    error::{HooksError, Result},
    types::{ExecutionLogEntry, NewRule, Rule, RuleStats, RuleUpdate},
};

/// Rule store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleStore {
    rules: Arc<RwLock<Vec<Rule>>>,
    executions: Arc<RwLock<Vec<ExecutionLogEntry>>>,
}

impl InMemoryRuleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rules
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules: Arc::new(RwLock::new(rules)),
            executions: Arc::default(),
        }
    }

    /// Every appended execution log record, oldest first
    pub fn executions(&self) -> Vec<ExecutionLogEntry> {
        self.executions
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn load_enabled_rules(&self) -> Result<Vec<Rule>> {
        let rules = self
            .rules
            .read()
            .map_err(|e| HooksError::StorageError(format!("Failed to acquire read lock: {}", e)))?;
        Ok(rules.iter().filter(|rule| rule.enabled).cloned().collect())
    }

    async fn list_rules(&self) -> Result<Vec<Rule>> {
        let rules = self
            .rules
            .read()
            .map_err(|e| HooksError::StorageError(format!("Failed to acquire read lock: {}", e)))?;
        Ok(rules.clone())
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Rule> {
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

    async fn insert_rule(&self, rule: NewRule) -> Result<Rule> {
        let rule = rule.into_rule(Uuid::new_v4().to_string(), Utc::now());
        let mut rules = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        rules.push(rule.clone());
        Ok(rule)
    }

    async fn update_rule(&self, rule_id: &str, update: &RuleUpdate) -> Result<Rule> {
        let mut rules = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| HooksError::RuleNotFound(rule_id.to_string()))?;

        update.apply_to(rule, Utc::now());
        Ok(rule.clone())
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        let mut rules = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        let before = rules.len();
        rules.retain(|rule| rule.id != rule_id);

        if rules.len() == before {
            return Err(HooksError::RuleNotFound(rule_id.to_string()));
        }
        Ok(())
    }

    async fn append_execution_log(&self, entry: &ExecutionLogEntry) -> Result<()> {
        let mut executions = self.executions.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        executions.push(entry.clone());
        Ok(())
    }

    async fn update_rule_stats(&self, rule_id: &str, stats: &RuleStats) -> Result<()> {
        let mut rules = self.rules.write().map_err(|e| {
            HooksError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| HooksError::RuleNotFound(rule_id.to_string()))?;

        rule.stats = stats.clone();
        Ok(())
    }

    async fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        let executions = self
            .executions
            .read()
            .map_err(|e| HooksError::StorageError(format!("Failed to acquire read lock: {}", e)))?;
        Ok(executions.iter().rev().take(limit).cloned().collect())
    }
}
