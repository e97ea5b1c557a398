// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Migration run and item-log operations.
//!
//! The item log is append-only; `UNIQUE (run_id, principal_id)` in the schema
//! enforces the at-most-once invariant that resume correctness depends on.

use std::collections::HashMap;

use chrono::Utc;
use regroup_core::RegroupError;
use regroup_core::types::{ItemOutcome, MigrationRun, OutcomeCounts, RunStatus};
use rusqlite::{OptionalExtension, Row, params};

use super::{fmt_ts, parse_outcome, parse_status, parse_ts};
use crate::database::{Database, map_tr_err};

const RUN_COLUMNS: &str = "id, target_id, initiator, status, started_at, completed_at, \
     total, added, already_in, failed, skipped_manual, token_revoked, refresh_failed, error";

fn run_from_row(row: &Row<'_>) -> Result<MigrationRun, rusqlite::Error> {
    let status: String = row.get(3)?;
    let started_at: String = row.get(4)?;
    let completed_at: Option<String> = row.get(5)?;
    Ok(MigrationRun {
        id: row.get(0)?,
        target_id: row.get(1)?,
        initiator: row.get(2)?,
        status: parse_status(3, &status)?,
        started_at: parse_ts(4, &started_at)?,
        completed_at: completed_at.map(|s| parse_ts(5, &s)).transpose()?,
        counts: OutcomeCounts {
            total: row.get(6)?,
            added: row.get(7)?,
            already_in: row.get(8)?,
            failed: row.get(9)?,
            skipped_manual: row.get(10)?,
            token_revoked: row.get(11)?,
            refresh_failed: row.get(12)?,
        },
        error: row.get(13)?,
    })
}

/// Insert a new run row.
pub async fn insert_run(db: &Database, run: &MigrationRun) -> Result<(), RegroupError> {
    let run = run.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO migration_runs (id, target_id, initiator, status, started_at, total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run.id,
                    run.target_id,
                    run.initiator,
                    run.status.to_string(),
                    fmt_ts(&run.started_at),
                    run.counts.total,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find the run with status `running` for a target, if any.
///
/// At most one run per target should be running at a time; if historical data
/// violates that, the most recently started one wins.
pub async fn running_run_for_target(
    db: &Database,
    target_id: &str,
) -> Result<Option<MigrationRun>, RegroupError> {
    let target_id = target_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<MigrationRun>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM migration_runs
                     WHERE target_id = ?1 AND status = 'running'
                     ORDER BY started_at DESC LIMIT 1"
                ),
                params![target_id],
                run_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a run by id.
pub async fn get_run(db: &Database, run_id: &str) -> Result<Option<MigrationRun>, RegroupError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<MigrationRun>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {RUN_COLUMNS} FROM migration_runs WHERE id = ?1"),
                params![run_id],
                run_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List runs, newest first, optionally filtered by target.
pub async fn list_runs(
    db: &Database,
    target_id: Option<&str>,
) -> Result<Vec<MigrationRun>, RegroupError> {
    let target_id = target_id.map(String::from);
    db.connection()
        .call(move |conn| -> Result<Vec<MigrationRun>, rusqlite::Error> {
            match target_id {
                Some(target) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {RUN_COLUMNS} FROM migration_runs
                         WHERE target_id = ?1 ORDER BY started_at DESC"
                    ))?;
                    let rows = stmt.query_map(params![target], run_from_row)?;
                    rows.collect()
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {RUN_COLUMNS} FROM migration_runs ORDER BY started_at DESC"
                    ))?;
                    let rows = stmt.query_map([], run_from_row)?;
                    rows.collect()
                }
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Reconstruct the per-principal outcome map from a run's item log.
///
/// This is the read path resume depends on: principals present in the map
/// are skipped, and their outcomes are re-tallied into the final counts.
pub async fn outcome_map(
    db: &Database,
    run_id: &str,
) -> Result<HashMap<String, ItemOutcome>, RegroupError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(
            move |conn| -> Result<HashMap<String, ItemOutcome>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT principal_id, outcome FROM migration_items WHERE run_id = ?1",
                )?;
                let rows = stmt.query_map(params![run_id], |row| {
                    let principal_id: String = row.get(0)?;
                    let outcome: String = row.get(1)?;
                    Ok((principal_id, parse_outcome(1, &outcome)?))
                })?;
                rows.collect()
            },
        )
        .await
        .map_err(map_tr_err)
}

/// Append one item-log entry. Append-only: re-logging the same principal
/// within a run violates the UNIQUE constraint and is surfaced as an error.
pub async fn append_item(
    db: &Database,
    run_id: &str,
    principal_id: &str,
    outcome: ItemOutcome,
    error_detail: Option<&str>,
) -> Result<(), RegroupError> {
    let run_id = run_id.to_string();
    let principal_id = principal_id.to_string();
    let error_detail = error_detail.map(String::from);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO migration_items (run_id, principal_id, outcome, error_detail, attempted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run_id,
                    principal_id,
                    outcome.to_string(),
                    error_detail,
                    fmt_ts(&Utc::now()),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a run completed and persist its final aggregate counts.
pub async fn finalize_run(
    db: &Database,
    run_id: &str,
    counts: &OutcomeCounts,
) -> Result<(), RegroupError> {
    let run_id = run_id.to_string();
    let counts = *counts;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE migration_runs SET status = ?1, completed_at = ?2, total = ?3,
                 added = ?4, already_in = ?5, failed = ?6, skipped_manual = ?7,
                 token_revoked = ?8, refresh_failed = ?9
                 WHERE id = ?10",
                params![
                    RunStatus::Completed.to_string(),
                    fmt_ts(&Utc::now()),
                    counts.total,
                    counts.added,
                    counts.already_in,
                    counts.failed,
                    counts.skipped_manual,
                    counts.token_revoked,
                    counts.refresh_failed,
                    run_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a run failed with an engine-level error message.
///
/// Item-log entries already written are preserved.
pub async fn fail_run(db: &Database, run_id: &str, message: &str) -> Result<(), RegroupError> {
    let run_id = run_id.to_string();
    let message = message.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE migration_runs SET status = ?1, completed_at = ?2, error = ?3
                 WHERE id = ?4",
                params![
                    RunStatus::Failed.to_string(),
                    fmt_ts(&Utc::now()),
                    message,
                    run_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List the principals a run terminally failed on, with error detail.
pub async fn failed_principals(
    db: &Database,
    run_id: &str,
) -> Result<Vec<(String, Option<String>)>, RegroupError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(
            move |conn| -> Result<Vec<(String, Option<String>)>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT principal_id, error_detail FROM migration_items
                     WHERE run_id = ?1 AND outcome = 'failed' ORDER BY id",
                )?;
                let rows = stmt.query_map(params![run_id], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
                rows.collect()
            },
        )
        .await
        .map_err(map_tr_err)
}
