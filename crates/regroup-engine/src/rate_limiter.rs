// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial rate limiter: at most one release per fixed interval.
//!
//! Waiters form an explicit FIFO (the mpsc channel); a single owning
//! scheduler task releases one waiter per tick. The scheduler tracks only
//! the timestamp of the last release, not actual call completion, so the
//! outbound rate stays bounded regardless of downstream latency.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Serializes outgoing calls to at most `requests_per_second` per second.
///
/// Callers are served strictly in arrival order. `acquire()` resolving means
/// it is safe to issue the next call.
#[derive(Debug)]
pub struct RateLimiter {
    waiters: mpsc::UnboundedSender<oneshot::Sender<()>>,
}

impl RateLimiter {
    /// Spawns the scheduler task. Must be called within a tokio runtime.
    pub fn new(requests_per_second: u32) -> Self {
        let interval = Duration::from_secs_f64(1.0 / f64::from(requests_per_second.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel::<oneshot::Sender<()>>();

        tokio::spawn(async move {
            let mut last_release: Option<Instant> = None;
            while let Some(waiter) = rx.recv().await {
                if let Some(last) = last_release {
                    sleep_until(last + interval).await;
                }
                // The waiter may have been dropped; that slot is still spent.
                let _ = waiter.send(());
                last_release = Some(Instant::now());
            }
            debug!("rate limiter scheduler stopped");
        });

        Self { waiters: tx }
    }

    /// Resolves once it is safe to issue the next call.
    pub async fn acquire(&self) {
        let (tx, rx) = oneshot::channel();
        if self.waiters.send(tx).is_ok() {
            // The scheduler only goes away when the limiter is dropped, and
            // we hold &self, so this await always completes.
            let _ = rx.await;
        }
    }
}
