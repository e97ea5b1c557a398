// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Regroup migration engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Regroup workspace. The engine crate
//! consumes the traits defined here; adapter crates implement them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RegroupError;
pub use types::{
    ItemOutcome, JoinOutcome, MigrationItem, MigrationRun, OutcomeCounts, Principal, RunStatus,
    TokenGrant,
};

pub use traits::{
    CandidateProvider, JoinApi, PrincipalStore, ProgressSink, RefreshApi, RefreshApiError,
};
