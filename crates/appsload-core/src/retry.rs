//! Generic retry-with-backoff policy, used by the shard writer's bulk write

use std::time::Duration;

/// A retry policy: how many attempts, and how long to sleep before each one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    base: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: Duration) -> Self {
        Self { max_attempts, base }
    }

    /// Superexponential backoff: no wait before the first attempt, then
    /// `base * attempt^attempt` before each subsequent one.
    ///
    /// attempt=0 -> 0s, attempt=1 -> base, attempt=2 -> base*4.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.base * attempt.pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}
