// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the staysync engine.
//!
//! Layered TOML loading via Figment (defaults, system, XDG, local, env),
//! `deny_unknown_fields` models, post-load semantic validation, and
//! miette-rendered diagnostics.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::StaysyncConfig;
pub use validation::validate_config;

/// Load configuration from the standard hierarchy and validate it.
///
/// All deserialization and validation errors are collected into one list so
/// the user sees every problem at once.
pub fn load_and_validate() -> Result<StaysyncConfig, Vec<ConfigError>> {
    let config = loader::load_config().map_err(diagnostic::figment_to_config_errors)?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from an explicit path and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<StaysyncConfig, Vec<ConfigError>> {
    let config =
        loader::load_config_from_path(path).map_err(diagnostic::figment_to_config_errors)?;
    validation::validate_config(&config)?;
    Ok(config)
}
