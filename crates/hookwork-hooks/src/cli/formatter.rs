//! Output formatting for rule commands

use crate::error::Result;
use crate::types::{ExecutionLogEntry, Rule, RuleOutcome};

/// Shorten `text` to at most `width` characters, marking the cut with `...`
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn action_summary(rule: &Rule) -> String {
    if rule.actions.is_empty() {
        return "-".to_string();
    }
    let mut actions: Vec<_> = rule.actions.iter().collect();
    actions.sort_by_key(|action| action.order);
    actions
        .iter()
        .map(|action| action.action_type.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn outcome_label(outcome: RuleOutcome) -> &'static str {
    match outcome {
        RuleOutcome::Succeeded => "Succeeded",
        RuleOutcome::PartiallyFailed => "Partial",
        RuleOutcome::Failed => "Failed",
    }
}

/// Format a single rule as a table
pub fn format_rule_table(rule: &Rule) -> String {
    let status = if rule.enabled {
        "✓ Enabled"
    } else {
        "✗ Disabled"
    };

    let mut output = String::new();
    output.push_str(&format!("ID:          {}\n", rule.id));
    output.push_str(&format!("Name:        {}\n", rule.name));
    if !rule.description.is_empty() {
        output.push_str(&format!("Description: {}\n", rule.description));
    }
    output.push_str(&format!("Trigger:     {}\n", rule.trigger));
    output.push_str(&format!("Priority:    {}\n", rule.priority));
    output.push_str(&format!("Status:      {}\n", status));

    if !rule.conditions.is_empty() {
        output.push_str("Conditions:\n");
        for condition in &rule.conditions {
            output.push_str(&format!(
                "  - {} {:?} {}\n",
                condition.field, condition.operator, condition.value
            ));
        }
    }
    output.push_str(&format!("Actions:     {}\n", action_summary(rule)));

    output.push_str(&format!("Executions:  {}\n", rule.stats.execution_count));
    output.push_str(&format!("Success:     {:.1}%\n", rule.stats.success_rate));
    if let Some(last) = rule.stats.last_executed_at {
        output.push_str(&format!("Last run:    {}\n", last.to_rfc3339()));
    }

    output
}

/// Format multiple rules as a table
pub fn format_rules_table(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return "No rules found".to_string();
    }

    let mut output = String::new();
    output.push_str("ID                                   | Name                     | Trigger            | Prio | Status   | Runs  | Actions\n");
    output.push_str("-------------------------------------|--------------------------|--------------------|------|----------|-------|-----------\n");

    for rule in rules {
        let status = if rule.enabled { "Enabled" } else { "Disabled" };

        output.push_str(&format!(
            "{:<36} | {:<24} | {:<18} | {:>4} | {:<8} | {:>5} | {}\n",
            truncate(&rule.id, 36),
            truncate(&rule.name, 24),
            truncate(rule.trigger.as_str(), 18),
            rule.priority,
            status,
            rule.stats.execution_count,
            action_summary(rule)
        ));
    }

    output
}

/// Format a single rule as JSON
pub fn format_rule_json(rule: &Rule) -> Result<String> {
    Ok(serde_json::to_string_pretty(rule)?)
}

/// Format multiple rules as JSON
pub fn format_rules_json(rules: &[Rule]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rules)?)
}

/// Format execution log records as a table
pub fn format_history_table(entries: &[ExecutionLogEntry]) -> String {
    if entries.is_empty() {
        return "No executions recorded".to_string();
    }

    let mut output = String::new();
    output.push_str("Executed At               | Rule                     | Trigger            | Outcome   | Actions | Duration\n");
    output.push_str("--------------------------|--------------------------|--------------------|-----------|---------|---------\n");

    for entry in entries {
        let result = &entry.result;
        output.push_str(&format!(
            "{:<25} | {:<24} | {:<18} | {:<9} | {:>3}/{:<3} | {}ms\n",
            entry.executed_at.format("%Y-%m-%d %H:%M:%S%.3f"),
            truncate(&entry.rule_name, 24),
            truncate(entry.trigger.as_str(), 18),
            outcome_label(result.outcome()),
            result.executed_actions,
            result.results.len(),
            entry.duration_ms
        ));
        for error in &result.errors {
            output.push_str(&format!("    ! {}\n", error));
        }
    }

    output
}

/// Format execution log records as JSON
pub fn format_history_json(entries: &[ExecutionLogEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}
