// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Principal store trait: durable credential lifecycle updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RegroupError;

/// Persists credential rotation and revocation for principals.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Atomically replace the stored encrypted credential pair and expiry.
    async fn store_credentials(
        &self,
        principal_id: &str,
        enc_access_token: Vec<u8>,
        enc_refresh_token: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RegroupError>;

    /// Mark the principal revoked and clear stored credentials.
    async fn mark_revoked(&self, principal_id: &str) -> Result<(), RegroupError>;
}
