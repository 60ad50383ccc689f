// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the hierarchy `./sqlgate.toml` > `~/.config/sqlgate/sqlgate.toml`
//! > `/etc/sqlgate/sqlgate.toml` with environment variable overrides via the
//! `SQLGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GatewayConfig;

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sqlgate/sqlgate.toml` (system-wide)
/// 3. `~/.config/sqlgate/sqlgate.toml` (user XDG config)
/// 4. `./sqlgate.toml` (local directory)
/// 5. `SQLGATE_*` environment variables
pub fn load_config() -> Result<GatewayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatewayConfig::default()))
        .merge(Toml::file("/etc/sqlgate/sqlgate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sqlgate/sqlgate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sqlgate.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup).
///
/// Used for testing and explicit inline configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<GatewayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatewayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GatewayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatewayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SQLGATE_RATE_LIMIT_MAX_REQUESTS` must
/// map to `rate_limit.max_requests`, not `rate.limit.max.requests`.
fn env_provider() -> Env {
    Env::prefixed("SQLGATE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("rate_limit_", "rate_limit.", 1)
            .replacen("breaker_", "breaker.", 1)
            .replacen("llm_", "llm.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("history_", "history.", 1)
            .replacen("validator_", "validator.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}
