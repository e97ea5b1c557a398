// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Regroup migration engine.

use thiserror::Error;

/// The primary error type used across all Regroup adapter traits and core operations.
#[derive(Debug, Error)]
pub enum RegroupError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Provider API errors (HTTP failure, unexpected response shape).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credential vault errors (bad key material, decryption failure).
    #[error("vault error: {0}")]
    Vault(String),

    /// A migration precondition was not met (target unreachable or unknown).
    /// Raised before any run record is created or mutated.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_include_context() {
        let err = RegroupError::Precondition("bot is not a member of guild 42".into());
        assert!(err.to_string().contains("guild 42"));

        let err = RegroupError::Provider {
            message: "HTTP request failed".into(),
            source: None,
        };
        assert!(err.to_string().contains("provider error"));
    }
}
