use std::{thread, time::Duration};

use tracing::{error, warn};

use crate::errors::{LedgerError, Result};

/// Bounded retry with exponential backoff for transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(25))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after the given failed attempt (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }

    /// Runs `operation` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// `operation` must leave the ledger untouched when it returns an error.
    /// Exhausting the attempts on transient failures yields [`LedgerError::WriteFailed`];
    /// any other error is returned as soon as it happens.
    pub fn run<T, F>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_after(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient ledger failure, retrying in {:?}",
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) if err.is_transient() => {
                    error!(
                        operation = label,
                        attempts = attempt,
                        error = %err,
                        "ledger write failed, giving up"
                    );
                    return Err(LedgerError::WriteFailed {
                        attempts: attempt,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}
