//! CLI commands for rule management
//!
//! Listing and inspection read the store directly so disabled rules are
//! visible too; state changes go through [`RuleManager`] so validation,
//! the cache and observers stay consistent.

pub mod commands;
pub mod formatter;

pub use commands::{
    delete_rule, disable_rule, enable_rule, history, inspect_rule, list_rules, OutputFormat,
    RuleCommand,
};
pub use formatter::{
    format_history_json, format_history_table, format_rule_json, format_rule_table,
    format_rules_json, format_rules_table,
};

use crate::{error::Result, manager::RuleManager};

/// Rule management CLI interface
#[derive(Debug, Clone)]
pub struct RuleCli {
    manager: RuleManager,
}

impl RuleCli {
    /// Create a CLI over a rule manager
    pub fn new(manager: RuleManager) -> Self {
        Self { manager }
    }

    /// Execute a rule command and render its output
    pub async fn execute(&self, command: RuleCommand) -> Result<String> {
        let store = self.manager.store();

        match command {
            RuleCommand::List { format } => {
                let rules = store.list_rules().await?;
                match format {
                    OutputFormat::Json => format_rules_json(&rules),
                    OutputFormat::Table => Ok(format_rules_table(&rules)),
                }
            }
            RuleCommand::Inspect { id, format } => {
                let rule = store.get_rule(&id).await?;
                match format {
                    OutputFormat::Json => format_rule_json(&rule),
                    OutputFormat::Table => Ok(format_rule_table(&rule)),
                }
            }
            RuleCommand::Enable { id } => {
                self.manager.enable(&id).await?;
                Ok(format!("Rule '{}' enabled", id))
            }
            RuleCommand::Disable { id } => {
                self.manager.disable(&id).await?;
                Ok(format!("Rule '{}' disabled", id))
            }
            RuleCommand::Delete { id } => {
                self.manager.delete(&id).await?;
                Ok(format!("Rule '{}' deleted", id))
            }
            RuleCommand::History { limit, format } => {
                let entries = store.recent_executions(limit).await?;
                match format {
                    OutputFormat::Json => format_history_json(&entries),
                    OutputFormat::Table => Ok(format_history_table(&entries)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        cache::RuleCache,
        error::HooksError,
        events::TriggerKind,
        notify::Notifier,
        store::{InMemoryRuleStore, RuleStore},
        types::{Action, NewRule, Rule},
    };

    async fn cli_with_rule(name: &str, enabled: bool) -> (RuleCli, Rule) {
        let store = Arc::new(InMemoryRuleStore::new());
        let rule = store
            .insert_rule(NewRule {
                name: name.to_string(),
                trigger: TriggerKind::MediaUploaded,
                actions: vec![Action::new("log")],
                enabled,
                ..NewRule::default()
            })
            .await
            .unwrap();
        let manager = RuleManager::new(store, RuleCache::new(), Notifier::new());
        (RuleCli::new(manager), rule)
    }

    #[tokio::test]
    async fn test_list_includes_disabled_rules() {
        let (cli, _) = cli_with_rule("Dormant", false).await;
        let output = cli.execute(list_rules()).await.unwrap();

        assert!(output.contains("Dormant"));
        assert!(output.contains("Disabled"));
    }

    #[tokio::test]
    async fn test_inspect_json() {
        let (cli, rule) = cli_with_rule("Rule 1", true).await;
        let output = cli
            .execute(RuleCommand::Inspect {
                id: rule.id.clone(),
                format: OutputFormat::Json,
            })
            .await
            .unwrap();

        assert!(output.contains(&rule.id));
        assert!(output.contains("media.uploaded"));
    }

    #[tokio::test]
    async fn test_enable_disable_delete() {
        let (cli, rule) = cli_with_rule("Rule 1", false).await;

        let output = cli.execute(enable_rule(&rule.id)).await.unwrap();
        assert!(output.contains("enabled"));

        let output = cli.execute(disable_rule(&rule.id)).await.unwrap();
        assert!(output.contains("disabled"));

        let output = cli.execute(delete_rule(&rule.id)).await.unwrap();
        assert!(output.contains("deleted"));

        let err = cli.execute(inspect_rule(&rule.id)).await.unwrap_err();
        assert!(matches!(err, HooksError::RuleNotFound(_)));
    }

    #[tokio::test]
    async fn test_history_empty() {
        let (cli, _) = cli_with_rule("Rule 1", true).await;
        let output = cli.execute(history(10)).await.unwrap();
        assert_eq!(output, "No executions recorded");
    }
}
