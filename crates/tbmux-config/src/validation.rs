// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: required fields, duration minimums, path shape.

use thiserror::Error;

use crate::model::TbmuxConfig;

/// A configuration validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field is empty or missing.
    #[error("invalid config: {field} is empty")]
    EmptyField { field: &'static str },

    /// A duration field is below its documented minimum.
    #[error("invalid config: {field} must be at least {minimum} seconds")]
    DurationTooShort { field: &'static str, minimum: u64 },

    /// Any other malformed value.
    #[error("invalid config: {message}")]
    Invalid { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors rather than failing fast.
pub fn validate_config(config: &TbmuxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.db.trim().is_empty() {
        errors.push(ConfigError::EmptyField { field: "db" });
    }
    if config.upstream.api_url.trim().is_empty() {
        errors.push(ConfigError::EmptyField {
            field: "upstream.api_url",
        });
    }
    if config.upstream.auth_token.is_empty() {
        errors.push(ConfigError::EmptyField {
            field: "upstream.auth_token",
        });
    }
    if config.upstream.polling_timeout < 10 {
        errors.push(ConfigError::DurationTooShort {
            field: "upstream.polling_timeout",
            minimum: 10,
        });
    }
    if config.upstream.max_retry_interval < 60 {
        errors.push(ConfigError::DurationTooShort {
            field: "upstream.max_retry_interval",
            minimum: 60,
        });
    }
    if config.downstream.listen_addr.trim().is_empty() {
        errors.push(ConfigError::EmptyField {
            field: "downstream.listen_addr",
        });
    }
    if config.downstream.api_path.is_empty() {
        errors.push(ConfigError::EmptyField {
            field: "downstream.api_path",
        });
    } else if !config.downstream.api_path.starts_with('/') {
        errors.push(ConfigError::Invalid {
            message: format!(
                "downstream.api_path `{}` must be an absolute URL path",
                config.downstream.api_path
            ),
        });
    }
    if config.downstream.auth_token.is_empty() {
        errors.push(ConfigError::EmptyField {
            field: "downstream.auth_token",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid() -> TbmuxConfig {
        let mut config = TbmuxConfig::default();
        config.upstream.auth_token = "123:abc".to_string();
        config.downstream.listen_addr = "127.0.0.1:8081".to_string();
        config.downstream.auth_token = "local-secret".to_string();
        config
    }

    #[test]
    fn minimal_config_validates() {
        assert!(validate_config(&minimal_valid()).is_ok());
    }

    #[test]
    fn default_config_misses_required_tokens() {
        let errors = validate_config(&TbmuxConfig::default()).unwrap_err();
        let fields: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(fields.iter().any(|f| f.contains("upstream.auth_token")));
        assert!(fields.iter().any(|f| f.contains("downstream.listen_addr")));
        assert!(fields.iter().any(|f| f.contains("downstream.auth_token")));
    }

    #[test]
    fn short_polling_timeout_rejected() {
        let mut config = minimal_valid();
        config.upstream.polling_timeout = 5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("polling_timeout")));
    }

    #[test]
    fn short_retry_interval_rejected() {
        let mut config = minimal_valid();
        config.upstream.max_retry_interval = 30;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("max_retry_interval")));
    }

    #[test]
    fn relative_api_path_rejected() {
        let mut config = minimal_valid();
        config.downstream.api_path = "bot".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("api_path")));
    }
}
