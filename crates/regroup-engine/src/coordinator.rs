// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run lifecycle: create-or-resume, append, and terminal transitions.
//!
//! Resume is keyed by target id: an interrupted run (status `running`) for
//! the same target is picked up and its item log is replayed into a
//! per-principal outcome map so already-processed principals are skipped.

use std::collections::HashMap;

use chrono::Utc;
use regroup_core::RegroupError;
use regroup_core::types::{ItemOutcome, MigrationRun, OutcomeCounts, RunStatus};
use regroup_storage::{Database, queries};
use tracing::info;
use uuid::Uuid;

/// Durable bookkeeping for migration runs, backed by SQLite.
#[derive(Clone)]
pub struct RunCoordinator {
    db: Database,
}

impl RunCoordinator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Resume the running run for `target_id` if one exists, otherwise create
    /// a fresh one. Returns the run plus the outcome map reconstructed from
    /// its item log (empty for a fresh run).
    pub async fn resolve_run(
        &self,
        target_id: &str,
        initiator: &str,
        candidate_count: u64,
    ) -> Result<(MigrationRun, HashMap<String, ItemOutcome>), RegroupError> {
        if let Some(run) = queries::runs::running_run_for_target(&self.db, target_id).await? {
            let done = queries::runs::outcome_map(&self.db, &run.id).await?;
            info!(
                run_id = %run.id,
                target_id,
                already_processed = done.len(),
                "resuming interrupted run"
            );
            return Ok((run, done));
        }

        let run = MigrationRun {
            id: Uuid::new_v4().to_string(),
            target_id: target_id.to_string(),
            initiator: initiator.to_string(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            counts: OutcomeCounts {
                total: candidate_count,
                ..Default::default()
            },
            error: None,
        };
        queries::runs::insert_run(&self.db, &run).await?;
        info!(run_id = %run.id, target_id, total = candidate_count, "starting new run");
        Ok((run, HashMap::new()))
    }

    /// Append one item-log entry; duplicates within a run are rejected by the
    /// storage layer.
    pub async fn append_item(
        &self,
        run_id: &str,
        principal_id: &str,
        outcome: ItemOutcome,
        error_detail: Option<&str>,
    ) -> Result<(), RegroupError> {
        queries::runs::append_item(&self.db, run_id, principal_id, outcome, error_detail).await
    }

    /// Mark the run completed with its final aggregate counts.
    pub async fn finalize(&self, run_id: &str, counts: &OutcomeCounts) -> Result<(), RegroupError> {
        queries::runs::finalize_run(&self.db, run_id, counts).await
    }

    /// Mark the run failed; the item log written so far is kept for resume.
    pub async fn fail(&self, run_id: &str, message: &str) -> Result<(), RegroupError> {
        queries::runs::fail_run(&self.db, run_id, message).await
    }

    /// Principals this run terminally failed on, with error detail.
    pub async fn failed_principals(
        &self,
        run_id: &str,
    ) -> Result<Vec<(String, Option<String>)>, RegroupError> {
        queries::runs::failed_principals(&self.db, run_id).await
    }

    /// Runs recorded for a target (or all targets), newest first.
    pub async fn list_runs(
        &self,
        target_id: Option<&str>,
    ) -> Result<Vec<MigrationRun>, RegroupError> {
        queries::runs::list_runs(&self.db, target_id).await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<MigrationRun>, RegroupError> {
        queries::runs::get_run(&self.db, run_id).await
    }
}
