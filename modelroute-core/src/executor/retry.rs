//! Retry delay policy for the fallback executor

use crate::executor::transport::TransportError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry pacing between attempts on the primary
/// provider. The attempt bound itself lives in the auto-scaling policy
/// (`max_retries`); this only decides how long to wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Base delay before a retry (milliseconds)
    pub base_delay_ms: u64,

    /// Cap on any single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Multiplier applied per attempt; 1.0 keeps the delay flat
    pub exponential_base: f64,

    /// Jitter factor (0.0 to 1.0) to randomize delays
    pub jitter_factor: f64,

    /// Whether to respect server-suggested retry-after hints
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            exponential_base: 2.0,
            jitter_factor: 0.1,
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// Flat delay with no backoff or jitter
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay_ms: delay.as_millis() as u64,
            max_delay_ms: delay.as_millis() as u64,
            exponential_base: 1.0,
            jitter_factor: 0.0,
            respect_retry_after: true,
        }
    }

    /// Exponential backoff starting from `delay`
    pub fn backoff_from(delay: Duration) -> Self {
        Self {
            base_delay_ms: delay.as_millis() as u64,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based) after `error`
    pub fn delay_for(&self, attempt: u32, error: &TransportError) -> Duration {
        if self.respect_retry_after {
            if let Some(hint) = error.retry_hint() {
                return hint;
            }
        }

        let base = self.base_delay_ms as f64 * self.exponential_base.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);

        let with_jitter = if self.jitter_factor > 0.0 {
            let mut rng = rand::thread_rng();
            let jitter_range = capped * self.jitter_factor;
            let jitter = rng.gen_range(-jitter_range..=jitter_range);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(with_jitter as u64)
    }
}
