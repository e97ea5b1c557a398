// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by the storage, provider, and CLI crates.

pub mod candidates;
pub mod progress;
pub mod provider;
pub mod store;

pub use candidates::CandidateProvider;
pub use progress::ProgressSink;
pub use provider::{JoinApi, RefreshApi, RefreshApiError};
pub use store::PrincipalStore;
