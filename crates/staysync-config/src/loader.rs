// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./staysync.toml` > `~/.config/staysync/staysync.toml`
//! > `/etc/staysync/staysync.toml` with environment variable overrides via
//! `STAYSYNC_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StaysyncConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/staysync/staysync.toml` (system-wide)
/// 3. `~/.config/staysync/staysync.toml` (user XDG config)
/// 4. `./staysync.toml` (local directory)
/// 5. `STAYSYNC_*` environment variables
pub fn load_config() -> Result<StaysyncConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<StaysyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StaysyncConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StaysyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StaysyncConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StaysyncConfig::default()))
        .merge(Toml::file("/etc/staysync/staysync.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("staysync/staysync.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("staysync.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `STAYSYNC_PMS_API_KEY` must map to
/// `pms.api_key`, not `pms.api.key`.
fn env_provider() -> Env {
    Env::prefixed("STAYSYNC_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: STAYSYNC_AUTOMATION_WEBDRIVER_URL -> "automation_webdriver_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("sync_", "sync.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("pms_", "pms.", 1)
            .replacen("automation_", "automation.", 1)
            .replacen("reply_", "reply.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_from_empty_string() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.sync.log_level, "info");
        assert!(!config.pms.enabled);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[sync]
log_level = "debug"
interval_secs = 60

[pms]
enabled = true
api_key = "pms-key"
"#,
        )
        .unwrap();
        assert_eq!(config.sync.log_level, "debug");
        assert_eq!(config.sync.interval_secs, 60);
        assert!(config.pms.enabled);
        assert_eq!(config.pms.api_key.as_deref(), Some("pms-key"));
    }

    #[test]
    fn unknown_key_is_an_error() {
        let result = load_config_from_str(
            r#"
[automation]
webdrvier_url = "http://localhost:4444"
"#,
        );
        assert!(result.is_err());
    }
}
