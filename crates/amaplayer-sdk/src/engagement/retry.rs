//! Retry Policy
//!
//! Exponential backoff with a bounded number of attempts. Attempts are
//! zero-based: attempt `n` that fails waits `base * 2^n` before attempt
//! `n + 1`, and `max_attempts` is the total number of remote calls.

use std::time::Duration;

use crate::config::EngagementConfig;

/// Backoff schedule for failed like mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total remote calls allowed per action
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngagementConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EngagementConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay to wait after `attempt` failed, ignoring the attempt cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt.saturating_add(1) < self.max_attempts {
            Some(self.delay_for(attempt))
        } else {
            None
        }
    }

    pub fn is_exhausted(&self, attempt: u32) -> bool {
        self.next_delay(attempt).is_none()
    }
}
