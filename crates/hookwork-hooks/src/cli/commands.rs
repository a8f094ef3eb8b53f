//! Rule management commands

/// How command output is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,

    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// `Json` when `json` is set, `Table` otherwise
    pub fn json(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Rule management commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCommand {
    /// List all stored rules, enabled or not
    List { format: OutputFormat },

    /// Inspect a specific rule
    Inspect { id: String, format: OutputFormat },

    /// Enable a rule
    Enable { id: String },

    /// Disable a rule
    Disable { id: String },

    /// Delete a rule
    Delete { id: String },

    /// Show the most recent executions
    History { limit: usize, format: OutputFormat },
}

/// List all rules
pub fn list_rules() -> RuleCommand {
    RuleCommand::List {
        format: OutputFormat::Table,
    }
}

/// Inspect a rule
pub fn inspect_rule(id: impl Into<String>) -> RuleCommand {
    RuleCommand::Inspect {
        id: id.into(),
        format: OutputFormat::Table,
    }
}

/// Enable a rule
pub fn enable_rule(id: impl Into<String>) -> RuleCommand {
    RuleCommand::Enable { id: id.into() }
}

/// Disable a rule
pub fn disable_rule(id: impl Into<String>) -> RuleCommand {
    RuleCommand::Disable { id: id.into() }
}

/// Delete a rule
pub fn delete_rule(id: impl Into<String>) -> RuleCommand {
    RuleCommand::Delete { id: id.into() }
}

/// Show up to `limit` recent executions
pub fn history(limit: usize) -> RuleCommand {
    RuleCommand::History {
        limit,
        format: OutputFormat::Table,
    }
}
