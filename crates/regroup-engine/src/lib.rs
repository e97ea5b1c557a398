// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resumable, rate-limited batch migration engine.
//!
//! Moves previously authorized principals into a target collection through a
//! third-party HTTP API, one serial pass at a bounded call rate, with
//! bounded backoff retry, per-principal credential refresh, durable
//! append-only bookkeeping, and crash-resume by target id.

pub mod coordinator;
pub mod engine;
pub mod rate_limiter;
pub mod retry;
pub mod token;

pub use coordinator::RunCoordinator;
pub use engine::{EngineConfig, MigrationEngine, MigrationReport};
pub use rate_limiter::RateLimiter;
pub use retry::{RetryDecision, RetryPolicy};
pub use token::{TokenError, TokenManager};
