//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before attempt number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at `max`, plus up to 10% jitter. Attempt 0 waits nothing.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let Some(exponent) = attempt.checked_sub(1) else {
        return Duration::ZERO;
    };

    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_ms = match delay_ms / 10 {
        0 => 0,
        range => rand::thread_rng().gen_range(0..range),
    };

    Duration::from_millis(delay_ms.saturating_add(jitter_ms))
}

/// Consecutive-attempt tracker on top of [`calculate_backoff`].
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            attempt: 0,
        }
    }

    /// Delay for the next attempt; grows until [`reset`](Self::reset).
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, self.base_ms, self.max_ms)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
