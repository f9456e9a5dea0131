//! Retry policy with exponential backoff and jitter.

use rand::Rng;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff: BackoffStrategy,
    /// Upper bound applied to a server-provided Retry-After value.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff: BackoffStrategy::ExponentialWithJitter { factor: 2.0 },
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Backoff strategy for determining retry delays.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    Constant,
    /// `initial * factor^attempt`.
    Exponential { factor: f64 },
    /// Exponential base plus a random share of it, so concurrent jobs spread out.
    ExponentialWithJitter { factor: f64 },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0-indexed), capped at `max_delay`.
    pub fn delay(&self, attempt: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
        let delay = match self {
            BackoffStrategy::Constant => initial_delay,
            BackoffStrategy::Exponential { factor } => {
                initial_delay.mul_f64(factor.powi(attempt as i32))
            }
            BackoffStrategy::ExponentialWithJitter { factor } => {
                let base = initial_delay.as_secs_f64() * factor.powi(attempt as i32);
                let jitter = rand::rng().random::<f64>() * base;
                Duration::from_secs_f64(base + jitter)
            }
        };

        delay.min(max_delay)
    }
}

/// Tracks attempts for one logical request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of retries already handed out.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record a failure and return how long to wait, or `None` once retries are used up.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if self.attempt >= self.config.max_retries {
            return None;
        }

        let delay = match retry_after {
            Some(requested) => requested.min(self.config.max_retry_after),
            None => self.config.backoff.delay(
                self.attempt,
                self.config.initial_delay,
                self.config.max_delay,
            ),
        };

        self.attempt += 1;
        Some(delay)
    }
}
