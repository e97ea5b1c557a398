// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord API adapter for the Regroup migration engine.
//!
//! Provides [`DiscordClient`], which implements the core [`JoinApi`] and
//! [`RefreshApi`] traits against the Discord REST API: guild probing,
//! guild-member-add with outcome classification, and the OAuth token
//! refresh exchange.
//!
//! [`JoinApi`]: regroup_core::JoinApi
//! [`RefreshApi`]: regroup_core::RefreshApi

pub mod client;
pub mod types;

pub use client::DiscordClient;
