//! Rule management
//!
//! [`RuleManager`] is the only writer of rule definitions. Every change is
//! validated, persisted, and only then applied to the cache and announced to
//! observers. A failing store leaves the cache untouched.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    cache::RuleCache,
    config::ConfigValidator,
    error::Result,
    notify::{EngineEvent, Notifier},
    store::RuleStore,
    types::{NewRule, Rule, RuleUpdate},
};

/// CRUD façade keeping the cache consistent with the store
#[derive(Clone)]
pub struct RuleManager {
    store: Arc<dyn RuleStore>,
    cache: RuleCache,
    notifier: Notifier,
}

impl RuleManager {
    /// Create a manager over a store, cache and notifier
    pub fn new(store: Arc<dyn RuleStore>, cache: RuleCache, notifier: Notifier) -> Self {
        Self {
            store,
            cache,
            notifier,
        }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    /// Populate the cache with the store's enabled rules
    ///
    /// A store failure is logged and leaves the cache empty; it never
    /// propagates. Returns the number of cached rules.
    pub async fn load_all(&self) -> usize {
        let rules = match self.store.load_enabled_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                error!(error = %e, "Failed to load rules, starting with an empty cache");
                if let Err(e) = self.cache.replace_all(Vec::new()) {
                    error!(error = %e, "Failed to clear rule cache");
                }
                return 0;
            }
        };

        let count = rules.len();
        match self.cache.replace_all(rules) {
            Ok(()) => {
                info!(rule_count = count, "Loaded rules");
                count
            }
            Err(e) => {
                error!(error = %e, "Failed to populate rule cache");
                0
            }
        }
    }

    /// Create a rule
    ///
    /// # Errors
    ///
    /// Validation and store errors propagate unchanged.
    pub async fn create(&self, rule: NewRule) -> Result<Rule> {
        ConfigValidator::validate_new_rule(&rule)?;

        let rule = self.store.insert_rule(rule).await?;
        self.cache.upsert(rule.clone())?;

        debug!(rule_id = %rule.id, rule_name = %rule.name, "Created rule");
        self.notifier.notify(&EngineEvent::RuleCreated(rule.clone()));
        Ok(rule)
    }

    /// Apply a partial update to a rule
    pub async fn update(&self, rule_id: &str, update: RuleUpdate) -> Result<Rule> {
        ConfigValidator::validate_update(&update)?;

        let stored = self.store.update_rule(rule_id, &update).await?;
        let rule = self.cache.replace_definition(stored)?;

        debug!(rule_id = %rule.id, enabled = rule.enabled, "Updated rule");
        self.notifier.notify(&EngineEvent::RuleUpdated(rule.clone()));
        Ok(rule)
    }

    /// Delete a rule
    pub async fn delete(&self, rule_id: &str) -> Result<()> {
        self.store.delete_rule(rule_id).await?;
        self.cache.remove(rule_id)?;

        debug!(rule_id = %rule_id, "Deleted rule");
        self.notifier.notify(&EngineEvent::RuleDeleted {
            rule_id: rule_id.to_string(),
        });
        Ok(())
    }

    /// Enable a rule; takes effect on the next trigger
    pub async fn enable(&self, rule_id: &str) -> Result<Rule> {
        self.update(rule_id, RuleUpdate::enabled(true)).await
    }

    /// Disable a rule; already queued executions still run
    pub async fn disable(&self, rule_id: &str) -> Result<Rule> {
        self.update(rule_id, RuleUpdate::enabled(false)).await
    }

    /// A cached rule
    pub fn get(&self, rule_id: &str) -> Result<Rule> {
        self.cache.get(rule_id)
    }

    /// All cached rules in cache order
    pub fn list(&self) -> Result<Vec<Rule>> {
        self.cache.list()
    }
}

impl std::fmt::Debug for RuleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleManager")
            .field("cache", &self.cache)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
