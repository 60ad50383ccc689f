// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic SQL safety validation.
//!
//! The validator is the final authority over every statement the gateway
//! executes, whether it came from a caller, the LLM, the cache, or history.
//! It is intentionally regex-based and stateless: it rewrites at most one
//! thing (appending a LIMIT) and rejects everything else it dislikes.
//!
//! Layers, applied in order with short-circuit on first failure:
//! 1. Statement must begin with SELECT.
//! 2. No semicolons anywhere.
//! 3. No blocked keyword as a whole word.
//! 4. Append ` LIMIT <n>` when no LIMIT clause is present.
//! 5. Every identifier after FROM or JOIN must be allowlisted.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use sqlgate_config::ValidatorConfig;
use sqlgate_core::GatewayError;

/// Matches an existing `LIMIT <integer>` clause.
static LIMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bLIMIT\s+\d+\b").unwrap());

/// Captures the identifier immediately following FROM.
static FROM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bFROM\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Captures the identifier immediately following JOIN.
static JOIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bJOIN\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// The deterministic SQL safety gate.
///
/// Construction compiles one whole-word pattern per blocked keyword; the
/// allowlist is held as a lowercase set.
pub struct SqlValidator {
    default_limit: u32,
    allowlist: HashSet<String>,
    blocked: Vec<(String, Regex)>,
}

impl SqlValidator {
    /// Build a validator from policy configuration.
    pub fn new(config: &ValidatorConfig) -> Result<Self, GatewayError> {
        let mut blocked = Vec::with_capacity(config.blocked_keywords.len());
        for keyword in &config.blocked_keywords {
            let upper = keyword.to_uppercase();
            let pattern = format!(r"\b{}\b", regex::escape(&upper));
            let re = Regex::new(&pattern).map_err(|e| {
                GatewayError::Config(format!("invalid blocked keyword '{keyword}': {e}"))
            })?;
            blocked.push((upper, re));
        }
        Ok(Self {
            default_limit: config.default_limit,
            allowlist: config
                .allowlisted_tables
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            blocked,
        })
    }

    /// Validate a candidate statement, returning the sanitized form.
    ///
    /// The only rewrite performed is appending ` LIMIT <default>` when the
    /// statement carries no LIMIT clause, which makes the operation
    /// idempotent: re-validating an already-sanitized statement returns it
    /// unchanged.
    pub fn validate(&self, sql: &str) -> Result<String, GatewayError> {
        let trimmed = sql.trim();
        let upper = trimmed.to_uppercase();

        if !upper.starts_with("SELECT") {
            let verb = upper.split_whitespace().next().unwrap_or("").to_string();
            return Err(reject(format!(
                "only SELECT statements are allowed (got '{verb}')"
            )));
        }

        if trimmed.contains(';') {
            return Err(reject("semicolons are not allowed".into()));
        }

        for (keyword, pattern) in &self.blocked {
            if pattern.is_match(&upper) {
                return Err(reject(format!("keyword '{keyword}' is not allowed")));
            }
        }

        let sanitized = if LIMIT_PATTERN.is_match(&upper) {
            trimmed.to_string()
        } else {
            format!("{trimmed} LIMIT {}", self.default_limit)
        };

        for capture in FROM_PATTERN
            .captures_iter(&upper)
            .chain(JOIN_PATTERN.captures_iter(&upper))
        {
            let table = capture[1].to_lowercase();
            if !self.allowlist.contains(&table) {
                return Err(reject(format!("table '{table}' is not in the allowlist")));
            }
        }

        Ok(sanitized)
    }
}

fn reject(reason: String) -> GatewayError {
    GatewayError::Validation { reason }
}
