// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The migration engine: one serial pass over the pending candidates.
//!
//! Order of operations per run: probe the target, fetch candidates, resolve
//! (create or resume) the run, process pending principals one at a time
//! behind the rate limiter, then finalize. Engine-level errors mark the run
//! failed but keep its item log so the next invocation can resume.

use std::sync::Arc;
use std::time::Duration;

use regroup_core::types::{ItemOutcome, JoinOutcome, OutcomeCounts, Principal};
use regroup_core::{CandidateProvider, JoinApi, ProgressSink, RegroupError};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::coordinator::RunCoordinator;
use crate::rate_limiter::RateLimiter;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::token::{TokenError, TokenManager};

/// Pacing and retry knobs for a migration run.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub requests_per_second: u32,
    /// Emit a progress summary every this many processed principals.
    pub progress_interval: u64,
    /// Fixed pause between consecutive principals, on top of the rate limit.
    pub inter_item_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            progress_interval: 25,
            inter_item_delay: Duration::from_millis(200),
            retry: RetryPolicy::default(),
        }
    }
}

/// Final summary of a completed run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub run_id: String,
    pub counts: OutcomeCounts,
    /// Principals the run terminally failed on, with error detail.
    pub failed: Vec<(String, Option<String>)>,
}

/// A single join attempt's failure, as seen by the retry policy.
///
/// Only a provider rate limit is retryable; transport and provider errors
/// stop the retry loop and become a `failed` item outcome.
#[derive(Debug, Error)]
enum JoinAttemptError {
    #[error("rate limited by provider")]
    RateLimited(Duration),

    #[error("{0}")]
    Other(RegroupError),
}

/// Orchestrates one migration run end to end.
pub struct MigrationEngine {
    coordinator: RunCoordinator,
    tokens: TokenManager,
    join_api: Arc<dyn JoinApi>,
    candidates: Arc<dyn CandidateProvider>,
    config: EngineConfig,
}

impl MigrationEngine {
    pub fn new(
        coordinator: RunCoordinator,
        tokens: TokenManager,
        join_api: Arc<dyn JoinApi>,
        candidates: Arc<dyn CandidateProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            coordinator,
            tokens,
            join_api,
            candidates,
            config,
        }
    }

    /// Run (or resume) the migration for `target_id`.
    ///
    /// The target probe and candidate fetch happen before any run state is
    /// written, so a bad target or an unreachable source leaves no trace.
    pub async fn run(
        &self,
        target_id: &str,
        initiator: &str,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<MigrationReport, RegroupError> {
        if !self.join_api.probe_target(target_id).await? {
            return Err(RegroupError::Precondition(format!(
                "target {target_id} does not exist or is not accessible with the configured credentials"
            )));
        }

        let candidates = self.candidates.fetch_all().await?;
        let (run, done) = self
            .coordinator
            .resolve_run(target_id, initiator, candidates.len() as u64)
            .await?;

        // Re-tally outcomes already logged by the interrupted run, then skip
        // those principals.
        let mut counts = OutcomeCounts::default();
        for outcome in done.values() {
            counts.record(*outcome);
        }
        let pending: Vec<&Principal> = candidates
            .iter()
            .filter(|p| !done.contains_key(&p.id))
            .collect();
        counts.total = (done.len() + pending.len()) as u64;

        info!(
            run_id = %run.id,
            target_id,
            pending = pending.len(),
            already_logged = done.len(),
            "processing candidates"
        );

        let pass = match self
            .run_items(&run.id, target_id, &pending, &mut counts, progress)
            .await
        {
            Ok(()) => self.coordinator.finalize(&run.id, &counts).await,
            Err(e) => Err(e),
        };
        if let Err(e) = pass {
            error!(run_id = %run.id, error = %e, "run aborted");
            if let Err(fail_err) = self.coordinator.fail(&run.id, &e.to_string()).await {
                warn!(run_id = %run.id, error = %fail_err, "could not record run failure");
            }
            return Err(e);
        }
        let failed = self.coordinator.failed_principals(&run.id).await?;
        info!(
            run_id = %run.id,
            added = counts.added,
            already_in = counts.already_in,
            failed = counts.failed,
            skipped_manual = counts.skipped_manual,
            token_revoked = counts.token_revoked,
            refresh_failed = counts.refresh_failed,
            "run completed"
        );
        Ok(MigrationReport {
            run_id: run.id,
            counts,
            failed,
        })
    }

    async fn run_items(
        &self,
        run_id: &str,
        target_id: &str,
        pending: &[&Principal],
        counts: &mut OutcomeCounts,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<(), RegroupError> {
        let limiter = RateLimiter::new(self.config.requests_per_second);
        let interval = self.config.progress_interval.max(1);

        for (i, principal) in pending.iter().enumerate() {
            let (outcome, detail) = self.process_one(&limiter, target_id, principal).await;
            self.coordinator
                .append_item(run_id, &principal.id, outcome, detail.as_deref())
                .await?;
            counts.record(outcome);
            debug!(principal_id = %principal.id, outcome = %outcome, "principal processed");

            let is_last = i + 1 == pending.len();
            if let Some(sink) = progress {
                if counts.processed() % interval == 0 || is_last {
                    // Best-effort: a failing sink never aborts the run.
                    if let Err(e) = sink
                        .on_progress(counts.processed(), counts.total, counts)
                        .await
                    {
                        warn!(error = %e, "progress sink failed");
                    }
                }
            }

            if !is_last && !self.config.inter_item_delay.is_zero() {
                sleep(self.config.inter_item_delay).await;
            }
        }
        Ok(())
    }

    /// Process a single principal. Per-item failures are classified into an
    /// outcome rather than propagated, so one bad principal never aborts the
    /// run.
    async fn process_one(
        &self,
        limiter: &RateLimiter,
        target_id: &str,
        principal: &Principal,
    ) -> (ItemOutcome, Option<String>) {
        // Precedence: a manually added member with nothing to migrate is a
        // skip even if their authorization was also revoked.
        if principal.manually_authorized && !principal.has_credentials() {
            return (ItemOutcome::SkippedManual, None);
        }
        if principal.revoked {
            return (ItemOutcome::TokenRevoked, None);
        }

        let token = match self.tokens.ensure_fresh(principal).await {
            Ok(token) => token,
            Err(TokenError::Revoked) => return (ItemOutcome::TokenRevoked, None),
            Err(TokenError::RefreshFailed(msg)) => {
                return (ItemOutcome::RefreshFailed, Some(msg));
            }
        };

        let join_api = self.join_api.as_ref();
        let principal_id = principal.id.as_str();
        let token = &token;
        let result = self
            .config
            .retry
            .run(
                |err: &JoinAttemptError| match err {
                    JoinAttemptError::RateLimited(after) => RetryDecision::Retry {
                        after: Some(*after),
                    },
                    JoinAttemptError::Other(_) => RetryDecision::Stop,
                },
                move |_attempt| async move {
                    limiter.acquire().await;
                    match join_api.join(target_id, principal_id, token).await {
                        Ok(JoinOutcome::RateLimited { retry_after }) => {
                            Err(JoinAttemptError::RateLimited(retry_after))
                        }
                        Ok(outcome) => Ok(outcome),
                        Err(e) => Err(JoinAttemptError::Other(e)),
                    }
                },
            )
            .await;

        match result {
            Ok(JoinOutcome::Added) => (ItemOutcome::Added, None),
            Ok(JoinOutcome::AlreadyIn) => (ItemOutcome::AlreadyIn, None),
            Ok(JoinOutcome::Failed { code, message }) => {
                let detail = match code {
                    Some(code) => format!("provider error {code}: {message}"),
                    None => message,
                };
                (ItemOutcome::Failed, Some(detail))
            }
            // The retry op never returns this variant as Ok.
            Ok(JoinOutcome::RateLimited { .. }) | Err(JoinAttemptError::RateLimited(_)) => (
                ItemOutcome::Failed,
                Some("rate limited; retry budget exhausted".to_string()),
            ),
            Err(JoinAttemptError::Other(e)) => (ItemOutcome::Failed, Some(e.to_string())),
        }
    }
}
