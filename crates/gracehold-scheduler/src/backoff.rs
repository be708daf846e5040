// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential retry backoff for capture attempts.

use gracehold_config::CaptureConfig;

/// Exponential backoff: `base * factor^attempt`, saturating.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    base_ms: u64,
    factor: u32,
}

impl BackoffPolicy {
    pub fn new(base_ms: u64, factor: u32) -> Self {
        Self {
            base_ms,
            factor: factor.max(1),
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.backoff_base_ms, config.backoff_factor)
    }

    /// Delay before the retry following attempt number `attempt` (0-based:
    /// the delay after the first failed attempt is `delay_for(0) == base`).
    pub fn delay_for(&self, attempt: u32) -> chrono::Duration {
        // Exponent is clamped; beyond ~16 doublings the value saturates anyway.
        let exp = attempt.min(16);
        let multiplier = u64::from(self.factor).saturating_pow(exp);
        let ms = self.base_ms.saturating_mul(multiplier);
        chrono::Duration::milliseconds(ms.min(i64::MAX as u64) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially() {
        let policy = BackoffPolicy::new(2000, 4);
        assert_eq!(policy.delay_for(0).num_milliseconds(), 2000);
        assert_eq!(policy.delay_for(1).num_milliseconds(), 8000);
        assert_eq!(policy.delay_for(2).num_milliseconds(), 32000);
    }

    #[test]
    fn factor_below_one_is_clamped() {
        let policy = BackoffPolicy::new(1000, 0);
        assert_eq!(policy.delay_for(5).num_milliseconds(), 1000);
    }

    #[test]
    fn large_attempt_counts_saturate_instead_of_overflowing() {
        let policy = BackoffPolicy::new(u64::MAX / 2, 4);
        let delay = policy.delay_for(u32::MAX);
        assert!(delay.num_milliseconds() > 0);
    }
}
