//! Bounded retry around a single upstream call
//!
//! At most three attempts. Rate limits wait a flat five seconds between
//! attempts: request volume is low enough that exponential growth buys
//! nothing, and the flat delay keeps test assertions and log math trivial.
//! Quota exhaustion never retries: another attempt inside the same billing
//! window cannot succeed. Delays are non-blocking tokio sleeps and every
//! slept delay is recorded on the outcome.

use crate::providers::error::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum attempts, including the first
pub const MAX_ATTEMPTS: u32 = 3;

/// Flat delay between attempts after a rate limit
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);

/// Flat delay between attempts after other transient failures
pub const TRANSIENT_DELAY: Duration = Duration::from_secs(1);

/// Outcome of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Final result: last error when every attempt failed
    pub result: Result<T, ProviderError>,

    /// Attempts actually made
    pub attempts: u32,

    /// Every delay slept between attempts, in order
    pub delays: Vec<Duration>,
}

/// Wraps single upstream calls with bounded retry
#[derive(Debug, Clone)]
pub struct RetryController {
    max_attempts: u32,
}

impl RetryController {
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Override the attempt bound (tests)
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Execute an operation, retrying transient failures
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempts = 0;
        let mut delays = Vec::new();

        loop {
            attempts += 1;
            match operation().await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                        delays,
                    };
                }
                Err(error) => {
                    if attempts >= self.max_attempts || !error.is_retryable() {
                        if error.is_retryable() {
                            warn!(attempts, "upstream call exhausted retries: {error}");
                        }
                        return RetryOutcome {
                            result: Err(error),
                            attempts,
                            delays,
                        };
                    }

                    let delay = Self::delay_for(&error);
                    debug!(attempts, ?delay, "transient upstream failure, backing off: {error}");
                    delays.push(delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Delay policy by failure class
    fn delay_for(error: &ProviderError) -> Duration {
        match error {
            ProviderError::RateLimit { .. } => RATE_LIMIT_DELAY,
            _ => TRANSIENT_DELAY,
        }
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new()
    }
}
