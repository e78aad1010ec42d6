use std::time::Duration;

use rand::Rng;

/// Bounded exponential backoff with random jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the delay added at random, 0.2 == up to +20%
    pub jitter: f64,
    /// Upper bound on how long a server-sent Retry-After is honoured within one fetch
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: 0.2,
            max_retry_after: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        with_jitter(delay, self.jitter)
    }

    /// Delay after a 429: the server's Retry-After when given (capped), else backoff
    pub fn rate_limit_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(wait) => wait.min(self.max_retry_after),
            None => self.backoff(attempt),
        }
    }
}

fn with_jitter(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 || delay.is_zero() {
        return delay;
    }
    let mut rng = rand::rng();
    let factor = 1.0 + rng.random_range(0.0..jitter);
    delay.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..Default::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.backoff(2);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1200));
        }
    }

    #[test]
    fn test_retry_after_takes_precedence_but_is_capped() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..Default::default()
        };
        assert_eq!(
            policy.rate_limit_delay(1, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(
            policy.rate_limit_delay(1, Some(Duration::from_secs(600))),
            Duration::from_secs(30)
        );
        assert_eq!(policy.rate_limit_delay(2, None), Duration::from_millis(1000));
    }
}
