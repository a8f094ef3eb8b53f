//! Exponential backoff between action attempts

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff schedule for retrying failed actions
///
/// The delay before retry `n` (0-based) is
/// `min(initial_delay_ms * multiplier^n, max_delay_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,
    /// Factor applied for every further retry
    pub multiplier: f64,
    /// Upper bound for a single delay in milliseconds
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Creates a policy with the default schedule (1s, 2s, 4s, ... capped at 30s)
    pub fn new() -> Self {
        Self {
            initial_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }

    /// Sets the initial delay
    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    /// Sets the multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the maximum delay
    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    /// Delay to wait before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let raw = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = if raw.is_finite() {
            raw.min(self.max_delay_ms as f64)
        } else {
            self.max_delay_ms as f64
        };
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
