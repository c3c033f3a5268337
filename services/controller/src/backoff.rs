//! Requeue delay after failed passes.

use std::time::Duration;

/// Exponential requeue delay.
///
/// Each consecutive failure doubles the delay, starting at `base` and capped
/// at `max`. A successful pass resets it.
#[derive(Debug, Clone)]
pub struct RequeueBackoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl RequeueBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: 0,
        }
    }

    /// Record a failure and return the delay before the requeued pass.
    pub fn record_failure(&mut self) -> Duration {
        let delay = self.delay_for(self.failures);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Clear failure tracking (on success).
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}
