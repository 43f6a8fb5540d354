//! Exponential backoff with jitter for upstream retries.

use std::time::Duration;

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    base_ms: u64,
    max_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms.max(config.base_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based), capped at the maximum
    /// and stretched by up to 10% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.base_ms == 0 {
            return Duration::ZERO;
        }

        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        let delay = self.base_ms.saturating_mul(factor).min(self.max_ms);
        let jitter = match delay / 10 {
            0 => 0,
            range => fastrand::u64(0..range),
        };
        Duration::from_millis(delay + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 1000,
        })
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let p = policy();
        assert_eq!(p.backoff(0), Duration::ZERO);

        let first = p.backoff(1).as_millis();
        assert!((100..110).contains(&first));

        let second = p.backoff(2).as_millis();
        assert!((200..220).contains(&second));

        let capped = p.backoff(40).as_millis();
        assert!((1000..1100).contains(&capped));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let p = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
        });
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.backoff(3), Duration::ZERO);
    }
}
