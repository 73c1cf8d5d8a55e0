//! Retry classification and full-jitter exponential backoff (spec §4.4).

use parking_lot::Mutex;
use rand::Rng;
use std::time::Duration;

const RETRYABLE_SUBSTRINGS: &[&str] =
    &["timeout", "connection refused", "connection reset", "deadline exceeded", "eof"];

const RETRYABLE_STATUS_TOKENS: &[&str] = &[" 429 ", " 500 ", " 502 ", " 503 ", " 504 "];

/// Whether an error message looks transient and worth retrying.
pub fn is_retryable(message: &str) -> bool {
    let lower = message.to_lowercase();
    if RETRYABLE_SUBSTRINGS.iter().any(|needle| lower.contains(needle)) {
        return true;
    }
    let padded = format!(" {lower} ");
    RETRYABLE_STATUS_TOKENS.iter().any(|token| padded.contains(token))
}

/// Full-jitter exponential backoff policy: `delay = uniform(0, min(maxBackoff, base * mult^attempt))`.
pub struct BackoffPolicy {
    pub base: Duration,
    pub mult: f64,
    pub max_backoff: Duration,
    pub max_retries: u32,
    rng: Mutex<rand::rngs::StdRng>,
}

impl BackoffPolicy {
    pub fn new(base: Duration, mult: f64, max_backoff: Duration, max_retries: u32) -> Self {
        use rand::SeedableRng;
        BackoffPolicy { base, mult, max_backoff, max_retries, rng: Mutex::new(rand::rngs::StdRng::from_entropy()) }
    }

    /// Delay to sleep before retry attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base.as_secs_f64() * self.mult.powi(attempt as i32);
        let capped = scaled.min(self.max_backoff.as_secs_f64()).max(0.0);
        let jittered = {
            let mut rng = self.rng.lock();
            rng.gen_range(0.0..=capped)
        };
        Duration::from_secs_f64(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_matches_timeouts_and_status_codes() {
        assert!(is_retryable("context deadline exceeded"));
        assert!(is_retryable("http 503 service unavailable"));
        assert!(is_retryable("connection refused"));
        assert!(!is_retryable("invalid api key"));
    }

    #[test]
    fn test_backoff_respects_cap() {
        let policy = BackoffPolicy::new(Duration::from_millis(10), 2.0, Duration::from_millis(50), 4);
        for attempt in 0..6 {
            let d = policy.delay_for(attempt);
            assert!(d <= Duration::from_millis(50));
        }
    }
}
