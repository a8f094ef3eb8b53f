//! JSON file rule store implementation
//!
//! Layout inside the store directory:
//!
//! ```text
//! <dir>/rules.json        pretty-printed array of rules, rewritten atomically
//! <dir>/executions.jsonl  one execution log record per line, append-only
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::{io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use super::RuleStore;
use crate::{
    error::{HooksError, Result},
    types::{ExecutionLogEntry, NewRule, Rule, RuleStats, RuleUpdate},
};

const RULES_FILE: &str = "rules.json";
const EXECUTIONS_FILE: &str = "executions.jsonl";

/// Rule store persisted as JSON files in a directory
#[derive(Debug)]
pub struct JsonFileRuleStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on rules.json and appends
    write_lock: Mutex<()>,
}

impl JsonFileRuleStore {
    /// Open (or lazily create) a store in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rules_path(&self) -> PathBuf {
        self.dir.join(RULES_FILE)
    }

    fn executions_path(&self) -> PathBuf {
        self.dir.join(EXECUTIONS_FILE)
    }

    async fn read_rules(&self) -> Result<Vec<Rule>> {
        let path = self.rules_path();
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            HooksError::StorageError(format!("Corrupt rule file {}: {}", path.display(), e))
        })
    }

    /// Write to a temp file, then rename over the real one
    async fn write_rules(&self, rules: &[Rule]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.rules_path();
        let temp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(rules)?;

        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!(path = %path.display(), rule_count = rules.len(), "Saved rules");
        Ok(())
    }

    async fn modify_rule<F>(&self, rule_id: &str, modify: F) -> Result<Rule>
    where
        F: FnOnce(&mut Rule) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut rules = self.read_rules().await?;

        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| HooksError::RuleNotFound(rule_id.to_string()))?;
        modify(rule);
        let updated = rule.clone();

        self.write_rules(&rules).await?;
        Ok(updated)
    }
}

#[async_trait]
impl RuleStore for JsonFileRuleStore {
    async fn load_enabled_rules(&self) -> Result<Vec<Rule>> {
        let rules = self.read_rules().await?;
        Ok(rules.into_iter().filter(|rule| rule.enabled).collect())
    }

    async fn list_rules(&self) -> Result<Vec<Rule>> {
        self.read_rules().await
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Rule> {
        self.read_rules()
            .await?
            .into_iter()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| HooksError::RuleNotFound(rule_id.to_string()))
    }

    async fn insert_rule(&self, rule: NewRule) -> Result<Rule> {
        let _guard = self.write_lock.lock().await;
        let mut rules = self.read_rules().await?;

        let rule = rule.into_rule(Uuid::new_v4().to_string(), Utc::now());
        rules.push(rule.clone());
        self.write_rules(&rules).await?;

        Ok(rule)
    }

    async fn update_rule(&self, rule_id: &str, update: &RuleUpdate) -> Result<Rule> {
        let update = update.clone();
        self.modify_rule(rule_id, move |rule| update.apply_to(rule, Utc::now()))
            .await
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rules = self.read_rules().await?;

        let before = rules.len();
        rules.retain(|rule| rule.id != rule_id);
        if rules.len() == before {
            return Err(HooksError::RuleNotFound(rule_id.to_string()));
        }

        self.write_rules(&rules).await
    }

    async fn append_execution_log(&self, entry: &ExecutionLogEntry) -> Result<()> {
        let json_line = serde_json::to_string(entry)? + "\n";

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.executions_path())
            .await?
            .write_all(json_line.as_bytes())
            .await?;

        Ok(())
    }

    async fn update_rule_stats(&self, rule_id: &str, stats: &RuleStats) -> Result<()> {
        let stats = stats.clone();
        self.modify_rule(rule_id, move |rule| rule.stats = stats)
            .await
            .map(|_| ())
    }

    async fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        let path = self.executions_path();
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let lines: Vec<&str> = content.lines().collect();
        let mut entries = Vec::new();

        for (line_no, line) in lines.iter().enumerate().rev() {
            if entries.len() >= limit {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ExecutionLogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed execution log line"
                ),
            }
        }

        Ok(entries)
    }
}
