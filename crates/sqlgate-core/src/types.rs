// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the sqlgate crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{GatewayError, PlannerCause};

/// Maximum accepted length of an inbound query string, in characters.
pub const MAX_QUERY_CHARS: usize = 4000;

/// An inbound request as handed to the orchestrator by a transport adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlRequest {
    /// The question: raw SQL or natural language, 1..=4000 chars.
    pub query: String,
    /// Opaque principal identifier. `None` falls back to the peer identity
    /// for rate limiting.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Caller-supplied trace id. Generated when absent.
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Skip the cache and history read path for this request.
    #[serde(default)]
    pub bypass_cache: bool,
}

impl SqlRequest {
    /// Convenience constructor for the common query-only case.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            correlation_id: None,
            bypass_cache: false,
        }
    }
}

/// Where a plan came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Fresh LLM generation.
    Llm,
    /// Rehydrated from the long-retention query history.
    History,
    /// Rehydrated from the short-term cache.
    ShortCache,
    /// The caller supplied raw SQL; no planning happened.
    Raw,
}

/// A validated intent to execute: the SQL, the model's confidence, and a
/// plain-language explanation. Immutable once produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlPlan {
    /// The SQL statement. After orchestration this is always the
    /// post-validator form.
    pub sql: String,
    /// Self-reported probability in [0, 1] that the SQL answers the question.
    pub confidence: f64,
    /// What the SQL does, in plain English.
    pub explanation: String,
    /// Provenance of this plan.
    pub source: PlanSource,
}

impl SqlPlan {
    /// Parse and validate a provider's structured-output JSON into a plan.
    ///
    /// Enforces the wire contract: non-empty `sql` containing a LIMIT
    /// clause, `confidence` in [0, 1], non-empty `explanation`. Violations
    /// are schema violations and are not retried within the same request.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, GatewayError> {
        let schema_err = |message: String| GatewayError::Planning {
            cause: PlannerCause::SchemaViolation,
            message,
        };

        let sql = value
            .get("sql")
            .and_then(|v| v.as_str())
            .ok_or_else(|| schema_err("missing or non-string 'sql' field".into()))?;
        if sql.trim().is_empty() {
            return Err(schema_err("'sql' must be non-empty".into()));
        }
        if !sql.to_uppercase().contains("LIMIT") {
            return Err(schema_err("'sql' must contain a LIMIT clause".into()));
        }

        let confidence = value
            .get("confidence")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| schema_err("missing or non-numeric 'confidence' field".into()))?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(schema_err(format!(
                "'confidence' must be within [0, 1], got {confidence}"
            )));
        }

        let explanation = value
            .get("explanation")
            .and_then(|v| v.as_str())
            .ok_or_else(|| schema_err("missing or non-string 'explanation' field".into()))?;
        if explanation.trim().is_empty() {
            return Err(schema_err("'explanation' must be non-empty".into()));
        }

        Ok(Self {
            sql: sql.to_string(),
            confidence,
            explanation: explanation.to_string(),
            source: PlanSource::Llm,
        })
    }

    /// Re-tag the plan's provenance (used when rehydrating from a store).
    pub fn with_source(mut self, source: PlanSource) -> Self {
        self.source = source;
        self
    }

    /// Replace the SQL with its post-validator form.
    pub fn with_sql(mut self, sql: String) -> Self {
        self.sql = sql;
        self
    }
}

/// Token usage and cost for one LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
}

impl LlmUsage {
    pub fn new(input_tokens: u32, output_tokens: u32, cost_usd: f64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cost_usd,
        }
    }
}

/// A tabular query result, eagerly materialized.
///
/// Scalars are JSON values: SQLite REAL becomes a float, INTEGER an i64,
/// TEXT a string, NULL null, BLOB a lowercase hex string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

/// The success-shaped response returned by the orchestrator.
///
/// A clarification response (the confidence gate declined to execute)
/// carries `result: None` and `notes: Some("low_confidence")`; the candidate
/// SQL stays visible in `plan` for the caller to confirm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlResponse {
    /// Always `"sql"`; kept for the transport envelope contract.
    pub tool_used: String,
    pub confidence: f64,
    pub result: Option<TableResult>,
    pub plan: SqlPlan,
    /// The request's correlation id.
    pub trace_id: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: f64,
    pub source: PlanSource,
    #[serde(default)]
    pub notes: Option<String>,
}
