// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential-backoff retry with jitter.
//!
//! Pure decorator: the policy has no idea what "retryable" means. The caller
//! supplies a classifier per call site that maps each error to an explicit
//! [`RetryDecision`], including a provider-dictated wait (e.g. a rate-limit
//! `retry_after`) that overrides the computed backoff.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

/// What to do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given wait, or after the computed backoff when `None`.
    Retry { after: Option<Duration> },
    /// The error is not retryable; propagate it unchanged.
    Stop,
}

/// Bounded exponential backoff policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff for the given (1-based) attempt:
    /// `min(base * factor^(attempt-1), max)` scaled by jitter in [0.5, 1.0].
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_secs_f64() * self.factor.powi(attempt as i32 - 1);
        let capped = exp.min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        Duration::from_secs_f64(capped * jitter)
    }

    /// Run `op` until it succeeds, the classifier says stop, or attempts are
    /// exhausted. The final error propagates unchanged.
    pub async fn run<T, E, F, Fut, C>(&self, classify: C, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDecision,
        E: std::fmt::Display,
    {
        let mut attempt = 1u32;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    match classify(&err) {
                        RetryDecision::Stop => return Err(err),
                        RetryDecision::Retry { after } => {
                            let delay = after.unwrap_or_else(|| self.backoff_delay(attempt));
                            warn!(
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "attempt failed; retrying"
                            );
                            sleep(delay).await;
                        }
                    }
                }
            }
            attempt += 1;
        }
    }
}
