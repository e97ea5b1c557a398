// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress sink trait: live run progress delivery.

use async_trait::async_trait;

use crate::error::RegroupError;
use crate::types::OutcomeCounts;

/// Receives periodic progress summaries during a run.
///
/// Delivery is best-effort: the engine logs and swallows sink errors, so a
/// failing sink never aborts a migration.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_progress(
        &self,
        processed: u64,
        total: u64,
        counts: &OutcomeCounts,
    ) -> Result<(), RegroupError>;
}
