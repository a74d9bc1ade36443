// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and usable timeouts.

use crate::diagnostic::ConfigError;
use crate::model::StaysyncConfig;

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &StaysyncConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !VALID_LOG_LEVELS.contains(&config.sync.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "sync.log_level `{}` is not one of: {}",
                config.sync.log_level,
                VALID_LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.sync.interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.interval_secs must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.pms.enabled {
        if config.pms.base_url.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "pms.base_url must not be empty when pms.enabled = true".to_string(),
            });
        }
        if config.pms.api_key.as_deref().unwrap_or("").trim().is_empty()
            && std::env::var("STAYSYNC_PMS_API_KEY").is_err()
        {
            errors.push(ConfigError::Validation {
                message: "pms.api_key (or STAYSYNC_PMS_API_KEY) is required when pms.enabled = true"
                    .to_string(),
            });
        }
    }

    if config.automation.enabled {
        if config.automation.webdriver_url.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "automation.webdriver_url must not be empty when automation.enabled = true"
                    .to_string(),
            });
        }
        if config.automation.platform_base_url.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message:
                    "automation.platform_base_url must not be empty when automation.enabled = true"
                        .to_string(),
            });
        }
        if config.automation.nav_timeout_secs == 0
            || config.automation.response_timeout_secs == 0
            || config.automation.element_wait_secs == 0
        {
            errors.push(ConfigError::Validation {
                message: "automation timeouts must all be at least 1 second".to_string(),
            });
        }
    }

    if config.reply.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "reply.max_tokens must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = StaysyncConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = StaysyncConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = StaysyncConfig::default();
        config.sync.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("log_level"))
        ));
    }

    #[test]
    fn pms_enabled_without_key_fails_validation() {
        let mut config = StaysyncConfig::default();
        config.pms.enabled = true;
        config.pms.api_key = None;
        // Only meaningful when the env var is absent in the test environment.
        if std::env::var("STAYSYNC_PMS_API_KEY").is_err() {
            let errors = validate_config(&config).unwrap_err();
            assert!(errors.iter().any(
                |e| matches!(e, ConfigError::Validation { message } if message.contains("pms.api_key"))
            ));
        }
    }

    #[test]
    fn zero_automation_timeout_fails_validation() {
        let mut config = StaysyncConfig::default();
        config.automation.element_wait_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("timeouts"))
        ));
    }
}
