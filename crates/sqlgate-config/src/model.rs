// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the sqlgate gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Defaults mirror the gateway's documented
//! operating points.

use serde::{Deserialize, Serialize};

/// Top-level sqlgate configuration.
///
/// Loaded from TOML files with environment variable overrides. All sections
/// are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Per-principal admission control.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// LLM-route circuit breaker.
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// LLM provider selection and call budget.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Short-term plan cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Long-retention query history.
    #[serde(default)]
    pub history: HistoryConfig,

    /// SQL safety validator policy.
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Sliding-window rate limiting, keyed by principal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per key per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_rate_window")]
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_seconds: default_rate_window(),
        }
    }
}

fn default_max_requests() -> u32 {
    100
}

fn default_rate_window() -> u64 {
    60
}

/// Circuit breaker thresholds for the LLM call path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    /// Failures within the window that trip the breaker open.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Sliding window for counting failures, in seconds.
    #[serde(default = "default_breaker_window")]
    pub window_seconds: u64,

    /// Seconds spent open before a half-open probe is allowed.
    #[serde(default = "default_recovery")]
    pub recovery_seconds: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            window_seconds: default_breaker_window(),
            recovery_seconds: default_recovery(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_breaker_window() -> u64 {
    60
}

fn default_recovery() -> u64 {
    30
}

/// LLM provider selection and per-call budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider to instantiate at startup: "openrouter", "anthropic",
    /// "openai", or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier passed to the provider. Empty selects the
    /// provider's default.
    #[serde(default)]
    pub model: String,

    /// API key. `None` requires an environment override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Wall-clock deadline for one LLM call, in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,

    /// Plans below this confidence are returned for clarification instead
    /// of executed. The threshold itself passes.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Completion token ceiling for one call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: String::new(),
            api_key: None,
            timeout_seconds: default_llm_timeout(),
            confidence_threshold: default_confidence_threshold(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

/// Short-term cache behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Disable to turn the cache into a no-op.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Serialized values larger than this are not cached.
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            ttl_seconds: default_cache_ttl(),
            max_value_bytes: default_max_value_bytes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    1800
}

fn default_max_value_bytes() -> usize {
    1_048_576
}

/// Query-history retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Days a stored query remains reusable before expiry.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

/// SQL safety validator policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    /// LIMIT appended to statements that carry none.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Tables that FROM/JOIN clauses may reference.
    #[serde(default = "default_allowlisted_tables")]
    pub allowlisted_tables: Vec<String>,

    /// Keywords rejected anywhere in a statement (whole-word match).
    #[serde(default = "default_blocked_keywords")]
    pub blocked_keywords: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            allowlisted_tables: default_allowlisted_tables(),
            blocked_keywords: default_blocked_keywords(),
        }
    }
}

fn default_limit() -> u32 {
    200
}

fn default_allowlisted_tables() -> Vec<String> {
    ["sales_fact", "job_runs", "audit_log"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_blocked_keywords() -> Vec<String> {
    [
        "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "TRUNCATE", "GRANT",
        "REVOKE", "COPY",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Persistence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
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
    "sqlgate.db".to_string()
}
