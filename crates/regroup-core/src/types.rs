// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Regroup workspace.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A previously authorized entity eligible for migration into the target
/// collection.
///
/// Created when the member first completes the authorization handshake;
/// mutated on credential refresh or revocation; never deleted (historical
/// record). Token blobs are AES-256-GCM ciphertexts with the 12-byte nonce
/// prepended (see `regroup-vault`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Opaque stable identity (the provider's user id).
    pub id: String,
    /// Encrypted OAuth access token, if one was ever issued.
    pub enc_access_token: Option<Vec<u8>>,
    /// Encrypted OAuth refresh token, if one was ever issued.
    pub enc_refresh_token: Option<Vec<u8>>,
    /// Expiry of the stored access token.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Member was added by hand and never went through the OAuth flow.
    pub manually_authorized: bool,
    /// The member has withdrawn authorization; stored credentials are gone.
    pub revoked: bool,
}

impl Principal {
    /// True when there is no usable credential pair on record.
    pub fn has_credentials(&self) -> bool {
        self.enc_access_token.is_some() && self.enc_refresh_token.is_some()
    }
}

/// Lifecycle state of a migration run. Completed and Failed are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// One execution of the migration engine against one target.
///
/// A run that ends in `Running` state only because the process terminated
/// is resumed by a subsequent invocation for the same target id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRun {
    /// Unique run id (UUID v4).
    pub id: String,
    /// The target collection (guild) being migrated into.
    pub target_id: String,
    /// Who started the run.
    pub initiator: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Aggregate per-outcome counters, persisted at finalization.
    pub counts: OutcomeCounts,
    /// Engine-level failure message when status is Failed.
    pub error: Option<String>,
}

/// Final per-principal outcome recorded in the item log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The provider accepted the member into the target.
    Added,
    /// The provider reported the member was already present.
    AlreadyIn,
    /// Terminal failure after retries exhausted, or an unexpected per-item error.
    Failed,
    /// Manually authorized member with no stored credential; nothing to migrate.
    SkippedManual,
    /// The member's authorization is revoked (previously or during refresh).
    TokenRevoked,
    /// Token refresh failed transiently; eligible for success on a future run.
    RefreshFailed,
}

/// Append-only per-principal outcome record within a run.
///
/// For a given run id a principal id appears at most once across the run's
/// lifetime, including resumed continuations. Resume depends on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationItem {
    pub run_id: String,
    pub principal_id: String,
    pub outcome: ItemOutcome,
    pub error_detail: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// Aggregate per-outcome counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub added: u64,
    pub already_in: u64,
    pub failed: u64,
    pub skipped_manual: u64,
    pub token_revoked: u64,
    pub refresh_failed: u64,
    /// Total candidates the run set out to process.
    pub total: u64,
}

impl OutcomeCounts {
    /// Increment the counter for one recorded outcome.
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Added => self.added += 1,
            ItemOutcome::AlreadyIn => self.already_in += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::SkippedManual => self.skipped_manual += 1,
            ItemOutcome::TokenRevoked => self.token_revoked += 1,
            ItemOutcome::RefreshFailed => self.refresh_failed += 1,
        }
    }

    /// Merge another set of counters into this one. `total` is kept from
    /// `self` (the resumed run's candidate total is authoritative).
    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.added += other.added;
        self.already_in += other.already_in;
        self.failed += other.failed;
        self.skipped_manual += other.skipped_manual;
        self.token_revoked += other.token_revoked;
        self.refresh_failed += other.refresh_failed;
    }

    /// Number of principals with a recorded outcome.
    pub fn processed(&self) -> u64 {
        self.added
            + self.already_in
            + self.failed
            + self.skipped_manual
            + self.token_revoked
            + self.refresh_failed
    }
}

/// Classified response from the join API for a single member.
///
/// `RateLimited` is the explicit retry signal consumed by the retry policy;
/// it never surfaces as a final item outcome by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Added,
    AlreadyIn,
    RateLimited { retry_after: Duration },
    Failed { code: Option<i64>, message: String },
}

/// A fresh credential pair returned by the refresh exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Duration,
}
