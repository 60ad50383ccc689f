// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the sqlgate gateway.
//!
//! Every error raised by a gateway component is one [`GatewayError`] variant
//! and carries a fixed classification: a category, a severity, and a
//! retryability flag. [`ErrorEnvelope`] renders any error into the stable
//! seven-key JSON record returned to callers.

use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString};
use thiserror::Error;

/// Classification for every error the gateway can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// LLM planning or generation failures.
    Planning,
    /// SQL safety or input validation failures.
    Validation,
    /// Query execution failures against the store.
    Execution,
    /// Wall-clock deadline overruns.
    Timeout,
    /// Per-principal admission rejections.
    RateLimit,
    /// Breaker-open rejections.
    CircuitBreaker,
    /// Short-term cache backend failures (never fatal to a request).
    Cache,
    /// Invalid or missing configuration.
    Configuration,
}

/// Severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Why the planner failed to produce a plan.
///
/// Distinguishes failures the caller may retry (the provider had a bad
/// moment) from failures that need a rephrased question (the model cannot
/// produce schema-conforming output for this input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PlannerCause {
    /// The provider call itself failed (HTTP error, empty response, ...).
    ProviderFailure,
    /// The provider answered but the JSON did not conform to the plan schema.
    SchemaViolation,
}

/// The primary error type used across all sqlgate crates.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A candidate SQL string failed the deterministic safety validator.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The planner could not turn natural language into a plan.
    #[error("planning failed ({cause}): {message}")]
    Planning { cause: PlannerCause, message: String },

    /// Query execution against the read-only store failed.
    #[error("execution failed: {message}")]
    Execution { message: String, retryable: bool },

    /// Persistence errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A wrapped call exceeded its wall-clock deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The caller exceeded its sliding-window request budget.
    #[error("rate limit exceeded for {key}: {limit} requests per {window_seconds}s, retry after {retry_after_seconds:.1}s")]
    RateLimit {
        key: String,
        limit: u32,
        window_seconds: u64,
        retry_after_seconds: f64,
    },

    /// The circuit breaker is open and rejected the call without issuing it.
    #[error("llm route unavailable (circuit breaker open), retry after {retry_after_seconds:.1}s")]
    CircuitOpen { retry_after_seconds: f64 },

    /// Short-term cache backend failure. The operation that observed it
    /// proceeds without the cache.
    #[error("cache error: {message}")]
    Cache { message: String },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// The taxonomy category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::Validation { .. } => ErrorCategory::Validation,
            GatewayError::Planning { .. } => ErrorCategory::Planning,
            GatewayError::Execution { .. } | GatewayError::Storage { .. } => {
                ErrorCategory::Execution
            }
            GatewayError::Timeout { .. } => ErrorCategory::Timeout,
            GatewayError::RateLimit { .. } => ErrorCategory::RateLimit,
            GatewayError::CircuitOpen { .. } => ErrorCategory::CircuitBreaker,
            GatewayError::Cache { .. } => ErrorCategory::Cache,
            GatewayError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// The taxonomy severity for this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GatewayError::Validation { .. }
            | GatewayError::Planning { .. }
            | GatewayError::Execution { .. }
            | GatewayError::Storage { .. } => ErrorSeverity::Error,
            GatewayError::Timeout { .. }
            | GatewayError::RateLimit { .. }
            | GatewayError::CircuitOpen { .. } => ErrorSeverity::Warning,
            GatewayError::Cache { .. } => ErrorSeverity::Info,
            GatewayError::Config(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether the caller may retry the same request.
    ///
    /// Safety failures are never retryable: a retry would merely gamble on a
    /// different unsafe output. Rate-limit and breaker rejections are
    /// retryable after their respective windows.
    pub fn retryable(&self) -> bool {
        match self {
            GatewayError::Validation { .. } => false,
            GatewayError::Planning { cause, .. } => {
                matches!(cause, PlannerCause::ProviderFailure)
            }
            GatewayError::Execution { retryable, .. } => *retryable,
            GatewayError::Storage { .. } => true,
            GatewayError::Timeout { .. } => true,
            GatewayError::RateLimit { .. } => true,
            GatewayError::CircuitOpen { .. } => true,
            GatewayError::Cache { .. } => false,
            GatewayError::Config(_) => false,
        }
    }

    /// The stable error-type name used in serialized envelopes.
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::Validation { .. } => "ValidationError",
            GatewayError::Planning { .. } => "PlannerError",
            GatewayError::Execution { .. } => "ExecutionError",
            GatewayError::Storage { .. } => "StorageError",
            GatewayError::Timeout { .. } => "TimeoutError",
            GatewayError::RateLimit { .. } => "RateLimitError",
            GatewayError::CircuitOpen { .. } => "CircuitBreakerError",
            GatewayError::Cache { .. } => "CacheError",
            GatewayError::Config(_) => "ConfigurationError",
        }
    }

    /// Machine-readable context for the serialized envelope.
    pub fn details(&self) -> serde_json::Value {
        match self {
            GatewayError::Planning { cause, .. } => {
                serde_json::json!({ "cause": cause.to_string() })
            }
            GatewayError::Timeout { duration } => {
                serde_json::json!({ "timeout_seconds": duration.as_secs_f64() })
            }
            GatewayError::RateLimit {
                key,
                limit,
                window_seconds,
                retry_after_seconds,
            } => serde_json::json!({
                "identifier": key,
                "limit": limit,
                "window_seconds": window_seconds,
                "retry_after_seconds": retry_after_seconds,
            }),
            GatewayError::CircuitOpen {
                retry_after_seconds,
            } => serde_json::json!({
                "state": "open",
                "retry_after_seconds": retry_after_seconds,
            }),
            _ => serde_json::json!({}),
        }
    }
}

/// The structured error record returned to callers.
///
/// Serializes with exactly the seven taxonomy keys plus the request's
/// correlation id.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error_type: String,
    pub message: String,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub retryable: bool,
    pub details: serde_json::Value,
    pub timestamp: String,
    pub correlation_id: String,
}

impl ErrorEnvelope {
    /// Build the envelope for an error observed in the request identified by
    /// `correlation_id`.
    pub fn from_error(err: &GatewayError, correlation_id: &str) -> Self {
        Self {
            error_type: err.error_type().to_string(),
            message: err.to_string(),
            category: err.category(),
            severity: err.severity(),
            retryable: err.retryable(),
            details: err.details(),
            timestamp: crate::now_iso8601(),
            correlation_id: correlation_id.to_string(),
        }
    }
}
