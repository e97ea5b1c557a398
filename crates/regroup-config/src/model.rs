// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Regroup migration engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Regroup configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegroupConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Discord API settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Migration engine pacing and lifecycle settings.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Exponential backoff retry settings for join calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Path to the 32-byte credential encryption key file (hex encoded).
    #[serde(default = "default_key_path")]
    pub credential_key_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            credential_key_path: default_key_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("regroup").join("regroup.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "regroup.db".to_string())
}

fn default_key_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("regroup").join("credential.key"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "credential.key".to_string())
}

/// Discord API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Bot token used for guild-member-add calls. `None` requires the
    /// `REGROUP_DISCORD_BOT_TOKEN` environment variable.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// OAuth application client id, used by the token refresh exchange.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth application client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// API base URL. Overridable for testing against a local mock.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            client_id: None,
            client_secret: None,
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

/// Migration engine pacing and lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Maximum outbound API calls per second.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Invoke the progress sink every N processed items.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Fixed pacing delay between items, in milliseconds.
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,

    /// Refresh an access token when it expires within this many seconds.
    #[serde(default = "default_refresh_buffer_secs")]
    pub refresh_buffer_secs: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            progress_interval: default_progress_interval(),
            inter_item_delay_ms: default_inter_item_delay_ms(),
            refresh_buffer_secs: default_refresh_buffer_secs(),
        }
    }
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_progress_interval() -> u64 {
    25
}

fn default_inter_item_delay_ms() -> u64 {
    200
}

fn default_refresh_buffer_secs() -> u64 {
    3600
}

/// Retry policy configuration for join calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum attempts per join call (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff delay ceiling, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier applied per attempt.
    #[serde(default = "default_factor")]
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            factor: default_factor(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_factor() -> f64 {
    2.0
}
