//! Rule and engine configuration validation
//!
//! Rules are validated before they reach the store, so a malformed
//! definition is rejected at create/update time instead of failing quietly
//! on every trigger.

use super::EngineConfig;
use crate::{
    error::{HooksError, Result},
    events::TriggerKind,
    types::{Action, Condition, ConditionOperator, NewRule, RuleUpdate},
};

/// Configuration validator
///
/// Checks that:
/// - Rule names and trigger names are non-empty
/// - Condition fields are non-empty and operators are known
/// - `in`/`not_in` conditions compare against an array
/// - Action types are non-empty
/// - The engine default timeout is positive and backoff never shrinks
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a rule about to be created
    pub fn validate_new_rule(rule: &NewRule) -> Result<()> {
        Self::validate_name(&rule.name)?;
        Self::validate_trigger(&rule.trigger)?;
        Self::validate_conditions(&rule.conditions)?;
        Self::validate_actions(&rule.actions)
    }

    /// Validate the fields a partial update sets
    pub fn validate_update(update: &RuleUpdate) -> Result<()> {
        if let Some(name) = &update.name {
            Self::validate_name(name)?;
        }
        if let Some(trigger) = &update.trigger {
            Self::validate_trigger(trigger)?;
        }
        if let Some(conditions) = &update.conditions {
            Self::validate_conditions(conditions)?;
        }
        if let Some(actions) = &update.actions {
            Self::validate_actions(actions)?;
        }
        Ok(())
    }

    /// Validate engine settings
    pub fn validate_engine(config: &EngineConfig) -> Result<()> {
        if config.default_timeout_ms == 0 {
            return Err(HooksError::InvalidConfiguration(
                "default_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !config.retry.multiplier.is_finite() || config.retry.multiplier < 1.0 {
            return Err(HooksError::InvalidConfiguration(format!(
                "retry.multiplier must be at least 1.0, got {}",
                config.retry.multiplier
            )));
        }

        if config.retry.max_delay_ms < config.retry.initial_delay_ms {
            return Err(HooksError::InvalidConfiguration(
                "retry.max_delay_ms must not be smaller than retry.initial_delay_ms".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(HooksError::ValidationError(
                "Rule name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_trigger(trigger: &TriggerKind) -> Result<()> {
        let name = trigger.as_str();
        if name.trim().is_empty() {
            return Err(HooksError::ValidationError(
                "Trigger cannot be empty".to_string(),
            ));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(HooksError::ValidationError(format!(
                "Invalid trigger name '{}': whitespace is not allowed",
                name
            )));
        }
        Ok(())
    }

    fn validate_conditions(conditions: &[Condition]) -> Result<()> {
        for (index, condition) in conditions.iter().enumerate() {
            if condition.field.trim().is_empty() {
                return Err(HooksError::ValidationError(format!(
                    "Condition {}: field cannot be empty",
                    index
                )));
            }

            match condition.operator {
                ConditionOperator::Unknown => {
                    return Err(HooksError::ValidationError(format!(
                        "Condition {}: unknown operator",
                        index
                    )));
                }
                ConditionOperator::In | ConditionOperator::NotIn
                    if !condition.value.is_array() =>
                {
                    return Err(HooksError::ValidationError(format!(
                        "Condition {}: '{}' needs an array value",
                        index, condition.field
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn validate_actions(actions: &[Action]) -> Result<()> {
        for (index, action) in actions.iter().enumerate() {
            if action.action_type.trim().is_empty() {
                return Err(HooksError::ValidationError(format!(
                    "Action {}: type cannot be empty",
                    index
                )));
            }
        }
        Ok(())
    }
}
