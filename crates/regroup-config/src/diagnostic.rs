// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge.
//!
//! Converts Figment deserialization errors into miette diagnostics so config
//! mistakes render with codes and help text instead of a bare Debug dump.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic information.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(regroup::config::unknown_key),
        help("remove the key or check its spelling against the documented sections")
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
    },

    /// A configuration value failed to deserialize.
    #[error("invalid configuration value: {detail}")]
    #[diagnostic(code(regroup::config::invalid_value))]
    InvalidValue {
        /// Description of the deserialization failure.
        detail: String,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(regroup::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(regroup::config::other))]
    Other(String),
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// A figment error may contain multiple underlying errors; each is converted
/// to its closest `ConfigError` variant.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();
    for error in err {
        let config_error = match &error.kind {
            Kind::UnknownField(field, _expected) => ConfigError::UnknownKey {
                key: field.clone(),
            },
            Kind::InvalidType(actual, expected) => {
                let key = error
                    .path
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(".");
                ConfigError::InvalidValue {
                    detail: format!("found {actual}, expected {expected} (key: {key})"),
                }
            }
            _ => ConfigError::Other(format!("{error}")),
        };
        errors.push(config_error);
    }
    errors
}

/// Render collected config errors to stderr via miette's fancy reporter.
pub fn render_errors(errors: &[ConfigError]) {
    for err in errors {
        eprintln!("{:?}", miette::Report::new(err.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegroupConfig;
    use figment::providers::{Format, Serialized, Toml};

    #[test]
    fn unknown_field_maps_to_unknown_key() {
        let err = figment::Figment::new()
            .merge(Serialized::defaults(RegroupConfig::default()))
            .merge(Toml::string("[migration]\nbogus_key = 1\n"))
            .extract::<RegroupConfig>()
            .unwrap_err();

        let errors = figment_to_config_errors(err);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ConfigError::UnknownKey { key } if key == "bogus_key")),
            "got: {errors:?}"
        );
    }
}
