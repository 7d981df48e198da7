use rand::Rng;
use std::time::Duration;

use crate::config::GatewayConfig;

/// Exponential backoff with jitter between gateway attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max: max.max(base) }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        )
    }

    /// Upper bound of the delay after the given (1-based) failed attempt.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let base_ms = self.base.as_millis() as u64;
        let ceiling_ms = base_ms.saturating_mul(2_u64.saturating_pow(exponent));
        Duration::from_millis(ceiling_ms).min(self.max)
    }

    /// Jittered delay, uniform in [ceiling / 2, ceiling].
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling_ms = self.ceiling(attempt).as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        let jittered = rand::thread_rng().gen_range(ceiling_ms / 2..=ceiling_ms);
        Duration::from_millis(jittered)
    }
}
