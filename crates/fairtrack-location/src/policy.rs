//! Bounded retry with per-attempt timeout escalation.

use fairtrack_core::config::LayeredConfig;
use fairtrack_core::models::{PositionOptions, RetryState, DEFAULT_MAX_ATTEMPTS};
use std::time::Duration;

/// Attempts (counted from zero) that still demand high accuracy
pub const HIGH_ACCURACY_ATTEMPTS: u32 = 2;

/// Retry schedule consulted by the acquisition controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the first retry
    pub first_retry_delay: Duration,
    /// Delay before every later retry
    pub retry_delay: Duration,
    pub base_timeout: Duration,
    /// Added to the deadline for each attempt already made
    pub timeout_step: Duration,
    pub maximum_age: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            first_retry_delay: Duration::from_millis(2_000),
            retry_delay: Duration::from_millis(5_000),
            base_timeout: Duration::from_millis(10_000),
            timeout_step: Duration::from_millis(5_000),
            maximum_age: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.value.max(1),
            first_retry_delay: Duration::from_millis(config.first_retry_delay_ms.value),
            retry_delay: Duration::from_millis(config.retry_delay_ms.value),
            base_timeout: Duration::from_millis(config.base_timeout_ms.value),
            timeout_step: Duration::from_millis(config.timeout_step_ms.value),
            maximum_age: Duration::from_millis(config.maximum_age_ms.value),
        }
    }

    /// Request options for the given zero-based attempt.
    ///
    /// High accuracy is demanded on the first two attempts and relaxed afterwards;
    /// the deadline grows by `timeout_step` per attempt.
    pub fn options_for(&self, attempt: u32) -> PositionOptions {
        PositionOptions {
            enable_high_accuracy: attempt < HIGH_ACCURACY_ATTEMPTS,
            timeout: self.base_timeout + self.timeout_step * attempt,
            maximum_age: self.maximum_age,
        }
    }

    /// Delay before running `attempt` (always >= 1, attempt 0 is immediate)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.first_retry_delay
        } else {
            self.retry_delay
        }
    }

    /// The attempt to schedule after the current one failed, if any remain
    pub fn next_attempt(&self, retry: &RetryState) -> Option<u32> {
        let next = retry.attempt + 1;
        (next < self.max_attempts).then_some(next)
    }

    pub fn initial_state(&self) -> RetryState {
        RetryState::new(self.max_attempts)
    }
}
