// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the staysync engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level staysync configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StaysyncConfig {
    /// Synchronization pass scheduling and logging.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// PMS API integration settings.
    #[serde(default)]
    pub pms: PmsConfig,

    /// Browser-automation transport settings.
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Reply-generation service settings.
    #[serde(default)]
    pub reply: ReplyConfig,
}

/// Synchronization pass scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between recurring timer passes in `staysync run`.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval_secs() -> u64 {
    300
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("staysync").join("staysync.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "staysync.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// PMS API integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PmsConfig {
    /// Whether the PMS delivery channel is available at all.
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the PMS API.
    #[serde(default = "default_pms_base_url")]
    pub base_url: String,

    /// PMS API key. `None` requires environment variable when enabled.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_pms_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_pms_base_url(),
            api_key: None,
            timeout_secs: default_pms_timeout_secs(),
        }
    }
}

fn default_pms_base_url() -> String {
    "https://api.pms.example.com".to_string()
}

fn default_pms_timeout_secs() -> u64 {
    30
}

/// Browser-automation transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationConfig {
    /// Whether the browser-automation transport is available at all.
    #[serde(default = "default_automation_enabled")]
    pub enabled: bool,

    /// WebDriver endpoint (chromedriver/geckodriver).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Base URL of the booking platform's web interface.
    #[serde(default = "default_platform_base_url")]
    pub platform_base_url: String,

    /// Navigation timeout in seconds.
    #[serde(default = "default_nav_timeout_secs")]
    pub nav_timeout_secs: u64,

    /// Timeout for the internal JSON API calls issued under the session.
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Per-element wait while locating composer/send controls, in seconds.
    #[serde(default = "default_element_wait_secs")]
    pub element_wait_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: default_automation_enabled(),
            webdriver_url: default_webdriver_url(),
            platform_base_url: default_platform_base_url(),
            nav_timeout_secs: default_nav_timeout_secs(),
            response_timeout_secs: default_response_timeout_secs(),
            element_wait_secs: default_element_wait_secs(),
        }
    }
}

fn default_automation_enabled() -> bool {
    true
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_platform_base_url() -> String {
    "https://www.bookingplatform.example".to_string()
}

fn default_nav_timeout_secs() -> u64 {
    30
}

fn default_response_timeout_secs() -> u64 {
    20
}

fn default_element_wait_secs() -> u64 {
    10
}

/// Reply-generation service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyConfig {
    /// Anthropic API key. `None` requires environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use for reply generation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
        }
    }
}

fn default_model() -> String {
    "claude-haiku-4-5-20250901".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}
