// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `regroup migrate` command implementation.
//!
//! Wires the configured storage, vault, and Discord client into the engine,
//! runs (or resumes) the migration, and prints the final summary.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regroup_config::RegroupConfig;
use regroup_core::RegroupError;
use regroup_discord::DiscordClient;
use regroup_engine::{EngineConfig, MigrationEngine, RetryPolicy, RunCoordinator, TokenManager};
use regroup_storage::{Database, SqliteCandidates, SqlitePrincipalStore};
use regroup_vault::CredentialCipher;
use secrecy::SecretString;

use crate::progress::ProgressBarSink;

/// How many failed members are listed inline before deferring to `status`.
const INLINE_FAILURE_LIMIT: usize = 10;

fn required(value: Option<&String>, key: &str) -> Result<String, RegroupError> {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| {
            RegroupError::Config(format!(
                "missing required config key `{key}` (set it in regroup.toml or the matching REGROUP_ environment variable)"
            ))
        })
}

/// Run the `regroup migrate` command.
pub async fn run_migrate(
    config: &RegroupConfig,
    target_id: &str,
    initiator: &str,
) -> Result<(), RegroupError> {
    let bot_token = required(config.discord.bot_token.as_ref(), "discord.bot_token")?;
    let client_id = required(config.discord.client_id.as_ref(), "discord.client_id")?;
    let client_secret = required(config.discord.client_secret.as_ref(), "discord.client_secret")?;

    let db = Database::open(&config.storage.database_path).await?;

    let key_path = Path::new(&config.storage.credential_key_path);
    let cipher = if key_path.exists() {
        CredentialCipher::from_key_file(key_path)?
    } else {
        CredentialCipher::generate_key_file(key_path)?
    };

    let client = Arc::new(DiscordClient::new(
        &SecretString::from(bot_token),
        client_id,
        SecretString::from(client_secret),
        config.discord.api_base.clone(),
    )?);

    let coordinator = RunCoordinator::new(db.clone());
    let tokens = TokenManager::new(
        Arc::new(cipher),
        client.clone(),
        Arc::new(SqlitePrincipalStore::new(db.clone())),
        Duration::from_secs(config.migration.refresh_buffer_secs),
    );
    let engine_config = EngineConfig {
        requests_per_second: config.migration.requests_per_second,
        progress_interval: config.migration.progress_interval,
        inter_item_delay: Duration::from_millis(config.migration.inter_item_delay_ms),
        retry: RetryPolicy {
            max_attempts: config.retry.max_attempts,
            base_delay: Duration::from_millis(config.retry.base_delay_ms),
            max_delay: Duration::from_millis(config.retry.max_delay_ms),
            factor: config.retry.factor,
        },
    };
    let engine = MigrationEngine::new(
        coordinator,
        tokens,
        client,
        Arc::new(SqliteCandidates::new(db.clone())),
        engine_config,
    );

    let progress = ProgressBarSink::new();
    let report = engine.run(target_id, initiator, Some(&progress)).await?;
    progress.finish();

    let c = &report.counts;
    println!("run {} completed for target {target_id}", report.run_id);
    println!("  total:          {}", c.total);
    println!("  added:          {}", c.added);
    println!("  already in:     {}", c.already_in);
    println!("  failed:         {}", c.failed);
    println!("  skipped manual: {}", c.skipped_manual);
    println!("  token revoked:  {}", c.token_revoked);
    println!("  refresh failed: {}", c.refresh_failed);

    if !report.failed.is_empty() {
        if report.failed.len() <= INLINE_FAILURE_LIMIT {
            println!("failed members:");
            for (principal_id, detail) in &report.failed {
                match detail {
                    Some(detail) => println!("  {principal_id}: {detail}"),
                    None => println!("  {principal_id}"),
                }
            }
        } else {
            println!(
                "{} members failed; run `regroup status --run {}` for the full list",
                report.failed.len(),
                report.run_id
            );
        }
    }

    db.close().await?;
    Ok(())
}
