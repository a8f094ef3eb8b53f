//! Configuration loader
//!
//! Reads the YAML configuration document. A file that does not exist is not
//! an error: it yields the default engine settings and no rules.

use std::path::Path;

use tracing::debug;

use super::HookworkConfig;
use crate::error::{HooksError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default configuration file name
    pub const DEFAULT_FILE: &'static str = "hookwork.yaml";

    /// Load configuration from a file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or does not
    /// parse.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<HookworkConfig> {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(HookworkConfig::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            HooksError::InvalidConfiguration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::parse_yaml(&content)?;
        debug!(
            path = %path.display(),
            rule_count = config.rules.len(),
            "Loaded config file"
        );
        Ok(config)
    }

    /// Parse YAML configuration content
    ///
    /// An empty document yields defaults.
    pub fn parse_yaml(content: &str) -> Result<HookworkConfig> {
        if content.trim().is_empty() {
            return Ok(HookworkConfig::default());
        }

        serde_yaml::from_str(content)
            .map_err(|e| HooksError::InvalidConfiguration(format!("Invalid YAML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        events::TriggerKind,
        types::{ConditionOperator, ValueType},
    };

    #[test]
    fn test_parse_full_document() {
        let yaml = r#"
engine:
  default_timeout_ms: 5000
  retry:
    initial_delay_ms: 10
rules:
  - name: Auto-generate audio
    description: Generate audio for long posts
    trigger: post.published
    priority: 1
    conditions:
      - field: content
        operator: exists
      - field: content.length
        operator: gt
        value: 100
        type: number
    actions:
      - type: generate_audio
        order: 1
        retry_count: 2
        timeout_ms: 300000
        parameters:
          text: "{{content}}"
          voice: default
"#;
        let config = ConfigLoader::parse_yaml(yaml).unwrap();

        assert_eq!(config.engine.default_timeout_ms, 5000);
        assert_eq!(config.engine.retry.initial_delay_ms, 10);
        assert_eq!(config.engine.retry.max_delay_ms, 30_000);
        assert!(config.engine.load_on_start);

        let rule = &config.rules[0];
        assert_eq!(rule.trigger, TriggerKind::PostPublished);
        assert!(rule.enabled);
        assert_eq!(rule.conditions[1].operator, ConditionOperator::Gt);
        assert_eq!(rule.conditions[1].value_type, ValueType::Number);
        assert_eq!(rule.conditions[1].value, json!(100));
        assert_eq!(rule.actions[0].retry_count, 2);
        assert_eq!(rule.actions[0].parameters["text"], json!("{{content}}"));
    }

    #[test]
    fn test_parse_empty_document() {
        let config = ConfigLoader::parse_yaml("").unwrap();
        assert_eq!(config, HookworkConfig::default());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = ConfigLoader::parse_yaml("rules: [unclosed").unwrap_err();
        assert!(matches!(err, HooksError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_parse_rule_missing_trigger() {
        let err = ConfigLoader::parse_yaml("rules:\n  - name: no trigger\n").unwrap_err();
        assert!(matches!(err, HooksError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_load_from_nonexistent_path() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from_path(dir.path().join("missing.yaml")).unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ConfigLoader::DEFAULT_FILE);
        std::fs::write(&path, "engine:\n  load_on_start: false\n").unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert!(!config.engine.load_on_start);
    }
}
