//! Bounded retry with a fixed pause between attempts

use log::warn;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How many extra attempts an operation gets, and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub retries: u32,
    pub delay: Duration,
}

/// Result of an operation together with how many attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// The operation receives the 1-based attempt number. On exhaustion the
    /// last error is returned. The pause only suspends the calling task.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        mut operation: F,
    ) -> Result<Attempted<T>, Attempted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    })
                }
                Err(e) if attempt >= max_attempts => {
                    return Err(Attempted {
                        value: e,
                        attempts: attempt,
                    })
                }
                Err(e) => {
                    warn!(
                        "{label} failed (attempt {attempt}/{max_attempts}): {e}; retrying in {:?}",
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
