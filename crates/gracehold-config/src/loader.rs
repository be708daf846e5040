// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./gracehold.toml` > `~/.config/gracehold/gracehold.toml`
//! > `/etc/gracehold/gracehold.toml` with environment variable overrides via
//! `GRACEHOLD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GraceholdConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/gracehold/gracehold.toml` (system-wide)
/// 3. `~/.config/gracehold/gracehold.toml` (user XDG config)
/// 4. `./gracehold.toml` (local directory)
/// 5. `GRACEHOLD_*` environment variables
pub fn load_config() -> Result<GraceholdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GraceholdConfig::default()))
        .merge(Toml::file("/etc/gracehold/gracehold.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("gracehold/gracehold.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("gracehold.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<GraceholdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GraceholdConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GraceholdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GraceholdConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `GRACEHOLD_WINDOW_TOKEN_SECRET` must map
/// to `window.token_secret`, not `window.token.secret`.
fn env_provider() -> Env {
    Env::prefixed("GRACEHOLD_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: GRACEHOLD_WINDOW_TOKEN_SECRET -> "window_token_secret"
        let key_str = key.as_str();
        for section in ["window", "capture", "storage"] {
            if let Some(rest) = key_str.strip_prefix(&format!("{section}_")) {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}
