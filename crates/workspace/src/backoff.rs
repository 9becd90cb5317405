//! Reconnect backoff policy for the channel client.

use std::time::Duration;

/// Exponential backoff with a cap and an attempt limit.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    pub initial: Duration,
    pub max: Duration,
    /// 0 = retry forever.
    pub max_attempts: u32,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl ReconnectBackoff {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(16);
        let delay = self.initial.saturating_mul(1u32 << exp);
        delay.min(self.max)
    }

    pub fn should_give_up(&self, attempt: u32) -> bool {
        self.max_attempts != 0 && attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_cap() {
        let backoff = ReconnectBackoff::default();
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(30));
    }

    #[test]
    fn attempt_limit() {
        let backoff = ReconnectBackoff::default();
        assert!(!backoff.should_give_up(4));
        assert!(backoff.should_give_up(5));

        let forever = ReconnectBackoff {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(!forever.should_give_up(10_000));
    }
}
