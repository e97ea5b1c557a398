// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `regroup-core::types` for use across
//! adapter trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use regroup_core::types::{
    ItemOutcome, MigrationItem, MigrationRun, OutcomeCounts, Principal, RunStatus,
};
