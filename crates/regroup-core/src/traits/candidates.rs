// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate provider trait: the source of principals to migrate.

use async_trait::async_trait;

use crate::error::RegroupError;
use crate::types::Principal;

/// Supplies the ordered list of principals eligible for migration.
///
/// The engine processes candidates strictly in the order returned here;
/// resumed runs filter out already-logged principals before iterating.
#[async_trait]
pub trait CandidateProvider: Send + Sync {
    /// Fetch the full candidate list, oldest authorization first.
    async fn fetch_all(&self) -> Result<Vec<Principal>, RegroupError>;
}
