// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./regroup.toml` > `~/.config/regroup/regroup.toml`
//! > `/etc/regroup/regroup.toml` with environment variable overrides via the
//! `REGROUP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RegroupConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/regroup/regroup.toml` (system-wide)
/// 3. `~/.config/regroup/regroup.toml` (user XDG config)
/// 4. `./regroup.toml` (local directory)
/// 5. `REGROUP_*` environment variables
pub fn load_config() -> Result<RegroupConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RegroupConfig::default()))
        .merge(Toml::file("/etc/regroup/regroup.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("regroup/regroup.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("regroup.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<RegroupConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RegroupConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RegroupConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RegroupConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `REGROUP_DISCORD_BOT_TOKEN`
/// must map to `discord.bot_token`, not `discord.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("REGROUP_").map(|key| {
        // `key` is the env var name with prefix stripped; figment passes it
        // in its original (upper) case, so lowercase before matching.
        // Example: REGROUP_DISCORD_BOT_TOKEN -> "discord_bot_token"
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("discord_", "discord.", 1)
            .replacen("migration_", "migration.", 1)
            .replacen("retry_", "retry.", 1);
        mapped.into()
    })
}
