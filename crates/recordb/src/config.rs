//! Transaction runner configuration.

use std::time::Duration;

/// Configuration options for a [`TransactionRunner`](crate::TransactionRunner).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum number of attempts per unit of work, including the first.
    /// Default: 10.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for each later attempt.
    /// Default: 10 milliseconds.
    pub initial_backoff: Duration,

    /// Upper bound on the delay between attempts.
    /// Default: 1 second.
    pub max_backoff: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RunnerConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts. Zero is treated as one.
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the initial backoff.
    #[must_use]
    pub const fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the backoff cap.
    #[must_use]
    pub const fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// A configuration that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// The delay after a failed `attempt` (1-based) before the next one.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_backoff.saturating_mul(1 << shift).min(self.max_backoff)
    }
}
