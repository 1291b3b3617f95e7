//! Backoff schedules
//!
//! Two schedules share one implementation: the per-action retry delay of the
//! sync engine (`2s * 2^(retry-1)`, uncapped in practice) and the realtime
//! reconnect delay (`2^min(attempt,5)` seconds capped at 30).

use std::time::Duration;

/// Configuration for backoff behavior
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay for the first attempt
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60 * 60),
        }
    }
}

impl BackoffConfig {
    /// Create a new backoff config with custom initial delay
    pub fn with_initial_delay(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            ..Default::default()
        }
    }

    /// Set the maximum delay
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Schedule used between replays of a queued action
    pub fn action_retry(base: Duration) -> Self {
        Self::with_initial_delay(base)
    }

    /// Schedule used between realtime reconnect attempts
    pub fn reconnect(max_delay: Duration) -> Self {
        Self::with_initial_delay(Duration::from_secs(2)).max_delay(max_delay)
    }
}

/// Exponential backoff without jitter
///
/// Attempts are 1-based: attempt 1 waits `initial_delay`, each further attempt
/// doubles the delay until `max_delay` is reached. Attempt 0 means "no wait".
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

/// Exponent clamp that keeps the float math finite
const MAX_EXPONENT: u32 = 32;

impl ExponentialBackoff {
    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay before the given 1-based attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 1).min(MAX_EXPONENT);
        let secs = self.config.initial_delay.as_secs_f64()
            * 2f64.powi(exponent as i32);
        if !secs.is_finite() || secs >= self.config.max_delay.as_secs_f64() {
            return self.config.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Delay before replaying an action that has already failed `retry_count` times
pub fn action_retry_delay(base: Duration, retry_count: u32) -> Duration {
    ExponentialBackoff::with_config(BackoffConfig::action_retry(base)).delay_for_attempt(retry_count)
}

/// Delay before the given realtime reconnect attempt
pub fn reconnect_delay(attempt: u32, max_delay: Duration) -> Duration {
    ExponentialBackoff::with_config(BackoffConfig::reconnect(max_delay)).delay_for_attempt(attempt)
}
