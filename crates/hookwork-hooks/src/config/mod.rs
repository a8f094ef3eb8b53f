//! Engine configuration, config file loading and rule validation
//!
//! Configuration lives in a single YAML document:
//!
//! ```yaml
//! engine:
//!   default_timeout_ms: 30000
//!   load_on_start: true
//!   retry:
//!     initial_delay_ms: 1000
//!     multiplier: 2.0
//!     max_delay_ms: 30000
//!
//! rules:
//!   - name: Auto-generate audio
//!     trigger: post.published
//!     conditions:
//!       - field: content.length
//!         operator: gt
//!         value: 100
//!         type: number
//!     actions:
//!       - type: generate_audio
//!         parameters:
//!           text: "{{content}}"
//!         retry_count: 2
//! ```
//!
//! Both sections are optional; a missing file means defaults and no rules.

pub mod loader;
pub mod validator;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use loader::ConfigLoader;
pub use validator::ConfigValidator;

use crate::{executor::RetryPolicy, types::NewRule};

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout for actions that do not declare one, in milliseconds
    pub default_timeout_ms: u64,

    /// Backoff between retries of a failed action
    pub retry: RetryPolicy,

    /// Whether `HookEngine::start` loads the enabled rules from the store
    pub load_on_start: bool,
}

impl EngineConfig {
    /// Default action timeout as a [`Duration`]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            load_on_start: true,
        }
    }
}

/// Parsed configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookworkConfig {
    /// Engine settings
    pub engine: EngineConfig,

    /// Rule definitions to import
    pub rules: Vec<NewRule>,
}
