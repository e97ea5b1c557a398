// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `regroup status` command implementation.
//!
//! Reads recorded runs straight from the database; works whether or not a
//! migration is currently in flight.

use regroup_config::RegroupConfig;
use regroup_core::RegroupError;
use regroup_core::types::MigrationRun;
use regroup_engine::RunCoordinator;
use regroup_storage::Database;

fn print_run(run: &MigrationRun) {
    println!(
        "{}  target {}  {}  started {}",
        run.id,
        run.target_id,
        run.status,
        run.started_at.format("%Y-%m-%d %H:%M:%SZ")
    );
    let c = &run.counts;
    println!(
        "    total {}  added {}  already_in {}  failed {}  skipped_manual {}  token_revoked {}  refresh_failed {}",
        c.total, c.added, c.already_in, c.failed, c.skipped_manual, c.token_revoked, c.refresh_failed
    );
    if let Some(error) = &run.error {
        println!("    error: {error}");
    }
}

/// Run the `regroup status` command.
pub async fn run_status(
    config: &RegroupConfig,
    target: Option<&str>,
    run: Option<&str>,
) -> Result<(), RegroupError> {
    let db = Database::open(&config.storage.database_path).await?;
    let coordinator = RunCoordinator::new(db.clone());

    if let Some(run_id) = run {
        match coordinator.get_run(run_id).await? {
            None => println!("no run with id {run_id}"),
            Some(found) => {
                print_run(&found);
                let failed = coordinator.failed_principals(run_id).await?;
                if failed.is_empty() {
                    println!("    no failed members");
                } else {
                    println!("    failed members:");
                    for (principal_id, detail) in &failed {
                        match detail {
                            Some(detail) => println!("      {principal_id}: {detail}"),
                            None => println!("      {principal_id}"),
                        }
                    }
                }
            }
        }
    } else {
        let runs = coordinator.list_runs(target).await?;
        if runs.is_empty() {
            println!("no migration runs recorded");
        }
        for run in &runs {
            print_run(run);
        }
    }

    db.close().await?;
    Ok(())
}
