//! Built-in action handlers
//!
//! - `log`: emits a tracing event with the `message` parameter
//! - `webhook`: sends the parameters' `body` plus the context to `url`
//! - `command`: runs `command` with `args` and captures its output
//!
//! None of these are registered by default; call
//! [`register_builtin_handlers`] to opt in.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::{ActionHandler, ActionHandlerRegistry};
use crate::{
    error::{HooksError, Result},
    types::ExecutionContext,
};

/// Register `log`, `webhook` and `command` on a registry
pub fn register_builtin_handlers(registry: &ActionHandlerRegistry) -> Result<()> {
    registry.register("log", LogHandler)?;
    registry.register("webhook", WebhookHandler::new()?)?;
    registry.register("command", CommandHandler)?;
    Ok(())
}

fn string_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

fn required_param<'a>(params: &'a Value, key: &str, handler: &str) -> Result<&'a str> {
    string_param(params, key).ok_or_else(|| {
        HooksError::ExecutionFailed(format!("{} action requires a '{}' parameter", handler, key))
    })
}

/// Writes the `message` parameter to the log at the requested `level`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandler;

#[async_trait]
impl ActionHandler for LogHandler {
    async fn handle(&self, params: Value, context: Arc<ExecutionContext>) -> Result<Value> {
        let message = string_param(&params, "message").unwrap_or_default();
        let trigger = context.trigger.as_str();

        match string_param(&params, "level").unwrap_or("info") {
            "debug" => debug!(trigger = %trigger, "{}", message),
            "warn" => warn!(trigger = %trigger, "{}", message),
            "error" => error!(trigger = %trigger, "{}", message),
            _ => info!(trigger = %trigger, "{}", message),
        }

        Ok(json!({"logged": true}))
    }
}

/// Sends an HTTP request carrying the event context
///
/// Parameters:
/// - `url` (required)
/// - `method` (default `POST`)
/// - `headers`: object of extra header names and values
/// - `body`: object merged into the request body next to `context`
#[derive(Debug, Clone)]
pub struct WebhookHandler {
    client: reqwest::Client,
}

impl WebhookHandler {
    /// Create a handler with its own HTTP client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HooksError::InvalidConfiguration(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a handler over an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request_body(params: &Value, context: &ExecutionContext) -> Result<Value> {
        let mut body = match params.get("body") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => serde_json::Map::new(),
            Some(other) => {
                return Err(HooksError::ExecutionFailed(format!(
                    "webhook body must be an object, got {}",
                    other
                )))
            }
        };
        body.insert("context".to_string(), serde_json::to_value(context)?);
        Ok(Value::Object(body))
    }
}

#[async_trait]
impl ActionHandler for WebhookHandler {
    async fn handle(&self, params: Value, context: Arc<ExecutionContext>) -> Result<Value> {
        let url = required_param(&params, "url", "webhook")?;
        let method = string_param(&params, "method").unwrap_or("POST");
        let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|e| HooksError::ExecutionFailed(format!("Invalid HTTP method: {}", e)))?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .json(&Self::request_body(&params, &context)?);

        if let Some(Value::Object(headers)) = params.get("headers") {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }

        debug!(url = %url, method = %method, "Sending webhook");

        let response = request
            .send()
            .await
            .map_err(|e| HooksError::ExecutionFailed(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HooksError::ExecutionFailed(format!("Webhook response: {}", e)))?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Webhook returned an error status");
            return Err(HooksError::ExecutionFailed(format!(
                "Webhook failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

/// Runs an external program
///
/// Parameters:
/// - `command` (required)
/// - `args`: array of arguments; non-string entries are passed as JSON
/// - `env`: object of extra environment variables
/// - `cwd`: working directory
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandHandler;

#[async_trait]
impl ActionHandler for CommandHandler {
    async fn handle(&self, params: Value, _context: Arc<ExecutionContext>) -> Result<Value> {
        let program = required_param(&params, "command", "command")?;

        let args: Vec<String> = match params.get("args") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };

        let env: HashMap<String, String> = match params.get("env") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect(),
            _ => HashMap::new(),
        };

        debug!(
            command = %program,
            args = ?args,
            "Executing command action"
        );

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(&args).envs(&env).kill_on_drop(true);
        if let Some(cwd) = string_param(&params, "cwd") {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().await.map_err(|e| {
            error!(command = %program, error = %e, "Failed to execute command");
            HooksError::ExecutionFailed(format!("Failed to execute command '{}': {}", program, e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            error!(
                command = %program,
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "Command execution failed with non-zero exit code"
            );
            return Err(HooksError::ExecutionFailed(format!(
                "Command '{}' failed with exit code {:?}: {}",
                program,
                output.status.code(),
                stderr.trim()
            )));
        }

        info!(
            command = %program,
            output_length = stdout.len(),
            "Command executed successfully"
        );

        Ok(json!({
            "stdout": stdout,
            "stderr": stderr,
            "exit_code": output.status.code(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::TriggerKind, types::ContextOverrides};

    fn context() -> Arc<ExecutionContext> {
        Arc::new(ExecutionContext::new(
            TriggerKind::PostPublished,
            json!({"id": 1}),
            ContextOverrides::default().with_user("u-1"),
        ))
    }

    #[test]
    fn test_register_builtin_handlers() {
        let registry = ActionHandlerRegistry::new();
        register_builtin_handlers(&registry).unwrap();
        assert_eq!(
            registry.action_types(),
            vec!["command".to_string(), "log".to_string(), "webhook".to_string()]
        );
    }

    #[tokio::test]
    async fn test_log_handler() {
        let output = LogHandler
            .handle(json!({"message": "hello", "level": "warn"}), context())
            .await
            .unwrap();
        assert_eq!(output, json!({"logged": true}));
    }

    #[test]
    fn test_webhook_body_includes_context() {
        let ctx = context();
        let body =
            WebhookHandler::request_body(&json!({"body": {"event": "published"}}), &ctx).unwrap();
        assert_eq!(body["event"], json!("published"));
        assert_eq!(body["context"]["trigger"], json!("post.published"));
        assert_eq!(body["context"]["user_id"], json!("u-1"));
    }

    #[test]
    fn test_webhook_body_must_be_object() {
        let ctx = context();
        assert!(WebhookHandler::request_body(&json!({"body": "text"}), &ctx).is_err());
    }

    #[tokio::test]
    async fn test_webhook_requires_url() {
        let handler = WebhookHandler::new().unwrap();
        let err = handler.handle(json!({}), context()).await.unwrap_err();
        assert!(err.to_string().contains("'url'"));
    }

    #[tokio::test]
    async fn test_command_requires_command() {
        let err = CommandHandler.handle(json!({}), context()).await.unwrap_err();
        assert!(matches!(err, HooksError::ExecutionFailed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_captures_stdout() {
        let output = CommandHandler
            .handle(json!({"command": "echo", "args": ["hello", 42]}), context())
            .await
            .unwrap();
        assert_eq!(output["stdout"], json!("hello 42\n"));
        assert_eq!(output["exit_code"], json!(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_non_zero_exit_fails() {
        let err = CommandHandler
            .handle(json!({"command": "false"}), context())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_command_missing_binary_fails() {
        let err = CommandHandler
            .handle(json!({"command": "definitely-not-a-real-binary-xyz"}), context())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to execute command"));
    }
}
