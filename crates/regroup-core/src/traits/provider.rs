// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider API traits: target membership and OAuth token refresh.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::error::RegroupError;
use crate::types::{JoinOutcome, TokenGrant};

/// The third-party membership API the engine joins members through.
#[async_trait]
pub trait JoinApi: Send + Sync {
    /// Returns true when the target exists and is reachable with the
    /// configured credentials. Used as the engine's precondition check.
    async fn probe_target(&self, target_id: &str) -> Result<bool, RegroupError>;

    /// Add one member to the target using their own access token.
    ///
    /// The response is classified into [`JoinOutcome`]; a rate-limit
    /// response becomes `JoinOutcome::RateLimited` rather than an error so
    /// the retry policy can consume it without exception-style control flow.
    /// Transport failures are returned as errors.
    async fn join(
        &self,
        target_id: &str,
        principal_id: &str,
        access_token: &SecretString,
    ) -> Result<JoinOutcome, RegroupError>;
}

/// Failure modes of the refresh exchange.
///
/// `InvalidGrant` means the refresh credential itself is permanently
/// unusable (the account revoked authorization). Everything else is
/// transient and leaves stored credentials untouched.
#[derive(Debug, Error)]
pub enum RefreshApiError {
    #[error("refresh grant is invalid; authorization was revoked")]
    InvalidGrant,

    #[error("transient refresh failure: {0}")]
    Transient(String),
}

/// The OAuth refresh endpoint.
#[async_trait]
pub trait RefreshApi: Send + Sync {
    /// Exchange a refresh token for a fresh credential pair.
    async fn refresh(&self, refresh_token: &SecretString)
    -> Result<TokenGrant, RefreshApiError>;
}
