// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Discord REST API surface Regroup touches.

use serde::{Deserialize, Serialize};

/// Body of `PUT /guilds/{guild}/members/{user}`.
#[derive(Debug, Serialize)]
pub struct GuildMemberAddRequest {
    pub access_token: String,
}

/// Successful response of `POST /oauth2/token`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
}

/// OAuth error body, e.g. `{"error": "invalid_grant"}`.
#[derive(Debug, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Rate limit body carried by HTTP 429 responses.
#[derive(Debug, Deserialize)]
pub struct RateLimitBody {
    /// Seconds to wait before retrying (fractional).
    pub retry_after: f64,
}

/// Generic Discord API error body.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}
