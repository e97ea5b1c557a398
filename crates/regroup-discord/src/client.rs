// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Discord REST API.
//!
//! Handles request construction, bot authentication, and classification of
//! responses into [`JoinOutcome`] / [`RefreshApiError`]. Retry and rate
//! pacing live in `regroup-engine`; this client only reports what the API
//! said.

use std::time::Duration;

use async_trait::async_trait;
use regroup_core::{JoinApi, JoinOutcome, RefreshApi, RefreshApiError, RegroupError, TokenGrant};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::types::{
    ApiErrorBody, GuildMemberAddRequest, OAuthErrorBody, RateLimitBody, TokenResponse,
};

/// HTTP client for Discord API communication.
///
/// Manages the bot authorization header, connection pooling, and the OAuth
/// client credentials used by the refresh exchange.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl DiscordClient {
    /// Creates a new Discord API client.
    ///
    /// # Arguments
    /// * `bot_token` - bot token for guild-member-add and guild lookups
    /// * `client_id` / `client_secret` - OAuth application credentials
    /// * `base_url` - API base, e.g. `https://discord.com/api/v10`
    pub fn new(
        bot_token: &SecretString,
        client_id: String,
        client_secret: SecretString,
        base_url: String,
    ) -> Result<Self, RegroupError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bot {}", bot_token.expose_secret()))
            .map_err(|e| RegroupError::Config(format!("invalid bot token header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RegroupError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        })
    }
}

#[async_trait]
impl JoinApi for DiscordClient {
    /// Checks that the guild exists and the bot can see it.
    async fn probe_target(&self, target_id: &str) -> Result<bool, RegroupError> {
        let url = format!("{}/guilds/{target_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RegroupError::Provider {
                message: format!("guild probe request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(target_id, status = %status, "guild probe response");
        match status {
            StatusCode::OK => Ok(true),
            // 404: no such guild; 403: the bot is not a member of it.
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(false),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(RegroupError::Provider {
                    message: format!("guild probe returned {status}: {body}"),
                    source: None,
                })
            }
        }
    }

    /// `PUT /guilds/{guild}/members/{user}` with the member's own access token.
    ///
    /// Response classification:
    /// * 201 -> `Added`
    /// * 204 -> `AlreadyIn` (the API's idempotent "already a member" answer)
    /// * 429 -> `RateLimited` with the body's `retry_after`
    /// * anything else -> terminal `Failed` with code and message
    async fn join(
        &self,
        target_id: &str,
        principal_id: &str,
        access_token: &SecretString,
    ) -> Result<JoinOutcome, RegroupError> {
        let url = format!("{}/guilds/{target_id}/members/{principal_id}", self.base_url);
        let body = GuildMemberAddRequest {
            access_token: access_token.expose_secret().to_string(),
        };

        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RegroupError::Provider {
                message: format!("guild member add request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(principal_id, status = %status, "guild member add response");

        match status {
            StatusCode::CREATED => Ok(JoinOutcome::Added),
            StatusCode::NO_CONTENT => Ok(JoinOutcome::AlreadyIn),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .json::<RateLimitBody>()
                    .await
                    .map(|b| b.retry_after)
                    .unwrap_or(1.0);
                warn!(principal_id, retry_after, "rate limited by provider");
                Ok(JoinOutcome::RateLimited {
                    retry_after: Duration::from_secs_f64(retry_after),
                })
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                let (code, message) = match serde_json::from_str::<ApiErrorBody>(&text) {
                    Ok(err) => (
                        err.code,
                        err.message.unwrap_or_else(|| format!("HTTP {status}")),
                    ),
                    Err(_) => (None, format!("HTTP {status}: {text}")),
                };
                Ok(JoinOutcome::Failed { code, message })
            }
        }
    }
}

#[async_trait]
impl RefreshApi for DiscordClient {
    /// `POST /oauth2/token` with a refresh token grant.
    ///
    /// `invalid_grant` means the member revoked authorization: permanent.
    /// Everything else (transport failure, 5xx, unparseable body) is
    /// transient and must leave stored credentials untouched.
    async fn refresh(
        &self,
        refresh_token: &SecretString,
    ) -> Result<TokenGrant, RefreshApiError> {
        let url = format!("{}/oauth2/token", self.base_url);
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| RefreshApiError::Transient(format!("refresh request failed: {e}")))?;

        let status = response.status();
        debug!(status = %status, "token refresh response");

        if status.is_success() {
            let token: TokenResponse = response
                .json()
                .await
                .map_err(|e| RefreshApiError::Transient(format!("bad refresh response: {e}")))?;
            return Ok(TokenGrant {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                expires_in: Duration::from_secs(token.expires_in),
            });
        }

        let text = response.text().await.unwrap_or_default();
        if let Ok(body) = serde_json::from_str::<OAuthErrorBody>(&text) {
            if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED)
                && body.error == "invalid_grant"
            {
                return Err(RefreshApiError::InvalidGrant);
            }
            let detail = match body.error_description {
                Some(description) => format!("{} ({description})", body.error),
                None => body.error,
            };
            return Err(RefreshApiError::Transient(format!(
                "refresh returned {status}: {detail}"
            )));
        }

        Err(RefreshApiError::Transient(format!(
            "refresh returned {status}: {text}"
        )))
    }
}
