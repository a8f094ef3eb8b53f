//! Variable substitution for action parameters
//!
//! Action parameters may reference the triggering event with `{{path}}`
//! placeholders. Paths are dot-separated and resolved against, in order:
//!
//! 1. the event data (`{{post.title}}`, `{{content.length}}`)
//! 2. the context metadata
//! 3. the context fields `trigger`, `timestamp`, `user_id` and `session_id`
//!
//! # Examples
//!
//! ```ignore
//! use hookwork_hooks::executor::VariableSubstitutor;
//! use serde_json::json;
//!
//! // context.event_data = {"title": "Hello", "id": 42}
//! let params = json!({"title": "Audio: {{title}}", "post_id": "{{id}}"});
//! let resolved = VariableSubstitutor::substitute_json(&params, &context)?;
//! assert_eq!(resolved, json!({"title": "Audio: Hello", "post_id": 42}));
//! ```
//!
//! A string that consists of exactly one placeholder is replaced by the
//! referenced value itself, so `"{{id}}"` above stays a number.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    error::{HooksError, Result},
    executor::condition::lookup_path,
    types::ExecutionContext,
};

/// Variable substitution engine
pub struct VariableSubstitutor;

impl VariableSubstitutor {
    /// Substitute every placeholder in a template string
    ///
    /// Fails with [`HooksError::SubstitutionError`] if any placeholder cannot
    /// be resolved.
    pub fn substitute(template: &str, context: &ExecutionContext) -> Result<String> {
        let mut result = String::with_capacity(template.len());
        let mut last = 0;

        for cap in placeholder_regex().captures_iter(template) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let value = Self::lookup_variable(name.as_str(), context)?;

            result.push_str(&template[last..whole.start()]);
            result.push_str(&value_to_string(&value));
            last = whole.end();
        }

        result.push_str(&template[last..]);
        Ok(result)
    }

    /// Substitute placeholders in every string of a JSON value
    ///
    /// Objects and arrays are walked recursively; other scalars are returned
    /// unchanged.
    pub fn substitute_json(value: &Value, context: &ExecutionContext) -> Result<Value> {
        match value {
            Value::String(s) => {
                if let Some(name) = sole_placeholder(s) {
                    return Self::lookup_variable(name, context);
                }
                Ok(Value::String(Self::substitute(s, context)?))
            }
            Value::Object(map) => {
                let mut result = Map::with_capacity(map.len());
                for (key, val) in map {
                    result.insert(key.clone(), Self::substitute_json(val, context)?);
                }
                Ok(Value::Object(result))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| Self::substitute_json(item, context))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn lookup_variable(name: &str, context: &ExecutionContext) -> Result<Value> {
        if let Some(value) = lookup_path(&context.event_data, name) {
            return Ok(value);
        }

        if let Some(value) = lookup_in_map(&context.metadata, name) {
            return Ok(value);
        }

        let builtin = match name {
            "trigger" => Some(Value::String(context.trigger.to_string())),
            "timestamp" => Some(Value::String(context.timestamp.to_rfc3339())),
            "user_id" => context.user_id.clone().map(Value::String),
            "session_id" => context.session_id.clone().map(Value::String),
            _ => None,
        };

        builtin.ok_or_else(|| {
            HooksError::SubstitutionError(format!("Variable not found in context: {}", name))
        })
    }
}

fn lookup_in_map(map: &Map<String, Value>, path: &str) -> Option<Value> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let value = map.get(head)?;

    match rest {
        Some(rest) => lookup_path(value, rest),
        None if value.is_null() => None,
        None => Some(value.clone()),
    }
}

/// The placeholder name if `s` is exactly one placeholder
fn sole_placeholder(s: &str) -> Option<&str> {
    let cap = placeholder_regex().captures(s)?;
    let whole = cap.get(0)?;
    if whole.start() == 0 && whole.end() == s.len() {
        cap.get(1).map(|name| name.as_str())
    } else {
        None
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        // {{name}} or {{nested.path}}
        Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_\.]*)\s*\}\}").expect("Invalid regex")
    })
}
