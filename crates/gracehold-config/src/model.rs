// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Gracehold orchestrator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Gracehold configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values,
/// except `window.token_secret` which must be set before serving traffic.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraceholdConfig {
    /// Modification window and token settings.
    #[serde(default)]
    pub window: WindowConfig,

    /// Capture scheduler and worker settings.
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Queue store settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Modification window and capability token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    /// Seconds between order placement and payment capture.
    #[serde(default = "default_capture_delay_seconds")]
    pub capture_delay_seconds: u64,

    /// Maximum capability token lifetime in seconds. The effective token
    /// window is min(capture_delay_seconds, max_token_age_seconds); the
    /// ceiling keeps a misconfigured max age from outliving the capture.
    #[serde(default = "default_max_token_age_seconds")]
    pub max_token_age_seconds: u64,

    /// Symmetric secret for token signatures. Must be non-empty.
    #[serde(default)]
    pub token_secret: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capture_delay_seconds: default_capture_delay_seconds(),
            max_token_age_seconds: default_max_token_age_seconds(),
            token_secret: String::new(),
        }
    }
}

fn default_capture_delay_seconds() -> u64 {
    600
}

fn default_max_token_age_seconds() -> u64 {
    900
}

/// Capture scheduler and worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    /// Maximum capture attempts before a job is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential retry backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Multiplier applied per retry attempt. Must be at least 1.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,

    /// Worker poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds a claimed job stays locked before a crashed worker's claim
    /// is considered stale and the job becomes claimable again.
    #[serde(default = "default_claim_timeout_seconds")]
    pub claim_timeout_seconds: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_factor: default_backoff_factor(),
            poll_interval_ms: default_poll_interval_ms(),
            claim_timeout_seconds: default_claim_timeout_seconds(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_backoff_factor() -> u32 {
    4
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_claim_timeout_seconds() -> u64 {
    300
}

/// Queue store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file holding capture jobs and dead letters.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("gracehold").join("gracehold.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "gracehold.db".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = GraceholdConfig::default();
        assert_eq!(config.window.capture_delay_seconds, 600);
        assert_eq!(config.window.max_token_age_seconds, 900);
        assert!(config.window.token_secret.is_empty());
        assert_eq!(config.capture.max_attempts, 3);
        assert!(config.capture.backoff_factor >= 1);
        assert!(config.storage.database_path.ends_with(".db"));
    }
}
