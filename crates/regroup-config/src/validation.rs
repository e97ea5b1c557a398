// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero rates and a backoff factor of at least one.

use crate::diagnostic::ConfigError;
use crate::model::RegroupConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RegroupConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.credential_key_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.credential_key_path must not be empty".to_string(),
        });
    }

    if config.migration.requests_per_second == 0 {
        errors.push(ConfigError::Validation {
            message: "migration.requests_per_second must be at least 1".to_string(),
        });
    }

    if config.migration.progress_interval == 0 {
        errors.push(ConfigError::Validation {
            message: "migration.progress_interval must be at least 1".to_string(),
        });
    }

    if config.retry.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "retry.max_attempts must be at least 1".to_string(),
        });
    }

    if config.retry.factor < 1.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "retry.factor must be at least 1.0, got {}",
                config.retry.factor
            ),
        });
    }

    if config.retry.max_delay_ms < config.retry.base_delay_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "retry.max_delay_ms ({}) must not be less than retry.base_delay_ms ({})",
                config.retry.max_delay_ms, config.retry.base_delay_ms
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
