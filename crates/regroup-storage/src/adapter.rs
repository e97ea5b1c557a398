// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait adapters exposing the storage crate through the core traits.
//!
//! The engine crate depends only on `regroup-core` traits; these thin
//! wrappers bind them to the SQLite query modules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regroup_core::{CandidateProvider, PrincipalStore, RegroupError, types::Principal};

use crate::database::Database;
use crate::queries::principals;

/// [`CandidateProvider`] backed by the principals table.
#[derive(Debug, Clone)]
pub struct SqliteCandidates {
    db: Database,
}

impl SqliteCandidates {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CandidateProvider for SqliteCandidates {
    async fn fetch_all(&self) -> Result<Vec<Principal>, RegroupError> {
        principals::fetch_all(&self.db).await
    }
}

/// [`PrincipalStore`] backed by the principals table.
#[derive(Debug, Clone)]
pub struct SqlitePrincipalStore {
    db: Database,
}

impl SqlitePrincipalStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PrincipalStore for SqlitePrincipalStore {
    async fn store_credentials(
        &self,
        principal_id: &str,
        enc_access_token: Vec<u8>,
        enc_refresh_token: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RegroupError> {
        principals::store_credentials(
            &self.db,
            principal_id,
            enc_access_token,
            enc_refresh_token,
            expires_at,
        )
        .await
    }

    async fn mark_revoked(&self, principal_id: &str) -> Result<(), RegroupError> {
        principals::mark_revoked(&self.db, principal_id).await
    }
}
