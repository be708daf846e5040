// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero windows and a non-empty token secret.

use crate::model::GraceholdConfig;

/// A single configuration validation failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GraceholdConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.window.capture_delay_seconds == 0 {
        errors.push(ConfigError::new(
            "window.capture_delay_seconds must be greater than zero",
        ));
    }

    if config.window.max_token_age_seconds == 0 {
        errors.push(ConfigError::new(
            "window.max_token_age_seconds must be greater than zero",
        ));
    }

    if config.window.token_secret.trim().is_empty() {
        errors.push(ConfigError::new(
            "window.token_secret must be set -- tokens cannot be signed without it",
        ));
    }

    if config.capture.max_attempts == 0 {
        errors.push(ConfigError::new(
            "capture.max_attempts must be at least 1",
        ));
    }

    if config.capture.backoff_factor < 1 {
        errors.push(ConfigError::new(format!(
            "capture.backoff_factor must be at least 1, got {}",
            config.capture.backoff_factor
        )));
    }

    if config.capture.poll_interval_ms == 0 {
        errors.push(ConfigError::new(
            "capture.poll_interval_ms must be greater than zero",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::new(
            "storage.database_path must not be empty",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraceholdConfig;

    fn valid_config() -> GraceholdConfig {
        let mut config = GraceholdConfig::default();
        config.window.token_secret = "test-secret".to_string();
        config
    }

    #[test]
    fn default_config_with_secret_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn missing_secret_is_rejected() {
        let config = GraceholdConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("token_secret")));
    }

    #[test]
    fn zero_windows_are_rejected_and_all_errors_collected() {
        let mut config = valid_config();
        config.window.capture_delay_seconds = 0;
        config.window.max_token_age_seconds = 0;
        config.capture.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn empty_database_path_is_rejected() {
        let mut config = valid_config();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("database_path")));
    }
}
