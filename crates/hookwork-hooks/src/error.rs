//! Error types for the hook engine
//!
//! All fallible operations in this crate return [`Result<T>`], an alias for
//! `std::result::Result<T, HooksError>`.
//!
//! # Error Handling Patterns
//!
//! 1. **Action errors**: handler failures and timeouts are retried up to the
//!    action's retry budget. Unknown action types and template substitution
//!    failures are terminal (see [`HooksError::is_retryable`]).
//!
//! 2. **Store errors**: propagate to the caller of the store operation
//!    (`RuleManager::create` fails visibly). Bookkeeping failures after a rule
//!    has executed are only logged.
//!
//! 3. **Condition anomalies**: never surface as errors. A missing field or a
//!    failed coercion makes the condition evaluate to `false`.
//!
//! # Examples
//!
//! ```ignore
//! match engine.create_rule(new_rule).await {
//!     Ok(rule) => println!("Created {}", rule.id),
//!     Err(HooksError::ValidationError(msg)) => eprintln!("Rejected: {}", msg),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

/// Errors that can occur in the hook engine
#[derive(Debug, Error)]
pub enum HooksError {
    /// Rule not found in the store or cache
    ///
    /// The string contains the rule ID that was not found.
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// Invalid configuration file or engine settings
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Rule definition failed validation
    ///
    /// Common causes:
    /// - Empty rule name
    /// - Empty action type or condition field
    /// - `in`/`not_in` condition whose value is not an array
    /// - Zero timeout
    #[error("Rule validation error: {0}")]
    ValidationError(String),

    /// No handler is registered for the action type
    ///
    /// Terminal: never retried.
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),

    /// Action handler returned an error
    #[error("Action execution failed: {0}")]
    ExecutionFailed(String),

    /// Action handler did not finish before its timeout
    ///
    /// The u64 contains the timeout in milliseconds.
    #[error("Action timed out after {0}ms")]
    Timeout(u64),

    /// A `{{placeholder}}` in the action parameters could not be resolved
    ///
    /// Terminal: never retried.
    #[error("Variable substitution error: {0}")]
    SubstitutionError(String),

    /// Rule store or cache failure
    ///
    /// Common causes:
    /// - Backing store unreachable
    /// - Lock poisoning
    /// - Corrupt store file
    #[error("Storage error: {0}")]
    StorageError(String),

    /// The execution queue no longer accepts work (engine shut down)
    #[error("Execution queue is closed")]
    QueueClosed,

    /// The engine was built outside a tokio runtime
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// YAML serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl HooksError {
    /// Whether an action that failed with this error may be attempted again
    ///
    /// Handler failures and timeouts are retryable. Everything else is a
    /// property of the action definition or engine state and would fail the
    /// same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HooksError::ExecutionFailed(_) | HooksError::Timeout(_))
    }
}

/// Result type for hook engine operations
pub type Result<T> = std::result::Result<T, HooksError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(HooksError::ExecutionFailed("boom".to_string()).is_retryable());
        assert!(HooksError::Timeout(50).is_retryable());
        assert!(!HooksError::UnknownActionType("nope".to_string()).is_retryable());
        assert!(!HooksError::SubstitutionError("x".to_string()).is_retryable());
        assert!(!HooksError::StorageError("down".to_string()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            HooksError::Timeout(50).to_string(),
            "Action timed out after 50ms"
        );
        assert_eq!(
            HooksError::UnknownActionType("send_fax".to_string()).to_string(),
            "Unknown action type: send_fax"
        );
    }
}
