// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the persistence tables.

use serde::{Deserialize, Serialize};

/// One append-only audit row. Stores digests, never plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Auto-increment row id.
    pub id: i64,
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Request trace id.
    pub correlation_id: String,
    /// Principal, when known.
    pub user_id: Option<String>,
    /// Originating tool; always "sql" for this gateway.
    pub tool: String,
    /// Action performed ("query", "clarification", ...).
    pub action: String,
    /// SHA-256 hex of the canonicalized input.
    pub input_hash: String,
    /// SHA-256 hex of the canonicalized output.
    pub output_hash: String,
    pub success: bool,
    pub duration_ms: i64,
    /// LLM input tokens attributable to this operation.
    pub tokens_input: i64,
    /// LLM output tokens attributable to this operation.
    pub tokens_output: i64,
    /// Estimated LLM spend for this operation, USD.
    pub cost_usd: f64,
}

/// One long-retention query-history row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// SHA-256 of the normalized natural-language query; unique.
    pub query_hash: String,
    pub natural_language_query: String,
    /// The validated (post-rewrite) SQL that was executed.
    pub generated_sql: String,
    pub confidence: f64,
    pub result_size_bytes: i64,
    pub row_count: i64,
    pub execution_time_ms: i64,
    pub tokens_input: i64,
    pub tokens_output: i64,
    pub cost_usd: f64,
    pub user_id: Option<String>,
    pub correlation_id: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 timestamp of the most recent reuse.
    pub last_used_at: String,
    /// Reuse counter, at least 1.
    pub use_count: i64,
    /// ISO 8601 expiry; always after `created_at`.
    pub expires_at: String,
}

/// The caller-supplied portion of a history row; timestamps, hash, counter,
/// and expiry are filled in by the store.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub natural_language_query: String,
    pub generated_sql: String,
    pub confidence: f64,
    pub result_size_bytes: i64,
    pub row_count: i64,
    pub execution_time_ms: i64,
    pub tokens_input: i64,
    pub tokens_output: i64,
    pub cost_usd: f64,
    pub user_id: Option<String>,
    pub correlation_id: Option<String>,
}
