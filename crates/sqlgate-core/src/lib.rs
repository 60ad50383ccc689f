// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the sqlgate gateway.
//!
//! This crate provides the error taxonomy, the shared request/plan/response
//! types, canonical hashing, and the [`LlmProvider`] trait implemented by
//! the vendor crates. All other sqlgate crates depend on this one.

pub mod error;
pub mod hash;
pub mod provider;
pub mod types;

pub use error::{ErrorCategory, ErrorEnvelope, ErrorSeverity, GatewayError, PlannerCause};
pub use hash::{canonical_hash, normalize_query, query_hash};
pub use provider::LlmProvider;
pub use types::{
    LlmUsage, PlanSource, SqlPlan, SqlRequest, SqlResponse, TableResult, MAX_QUERY_CHARS,
};

/// Current UTC time as an ISO-8601 string with millisecond precision.
///
/// This is the one timestamp format used everywhere: envelopes, audit rows,
/// history rows. The fixed format makes stored timestamps compare
/// lexicographically.
pub fn now_iso8601() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
