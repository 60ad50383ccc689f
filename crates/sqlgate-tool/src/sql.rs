// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The SQL tool: the gateway's top-level entry point.
//!
//! One call runs the full request lifecycle in order: admission, raw-SQL
//! classification, planning (for natural language), the confidence gate,
//! unconditional re-validation, execution, persistence, and audit. Every
//! statement handed to the executor came out of the validator within the
//! same request, whatever its source -- cache and history entries are
//! re-checked too, so a poisoned store cannot reach the database.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlgate_cache::PlanCache;
use sqlgate_config::GatewayConfig;
use sqlgate_core::{
    ErrorEnvelope, GatewayError, LlmProvider, LlmUsage, PlanSource, SqlPlan, SqlRequest,
    SqlResponse, MAX_QUERY_CHARS,
};
use sqlgate_planner::SqlPlanner;
use sqlgate_resilience::{CircuitBreaker, RateLimiter};
use sqlgate_storage::{AuditSink, Database, NewHistoryEntry, QueryExecutor, QueryHistory};
use sqlgate_validator::SqlValidator;
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::is_raw_sql;

/// Rate-limit key used when the request carries no principal.
const ANONYMOUS_PRINCIPAL: &str = "anonymous";

enum Outcome {
    Executed(SqlResponse),
    Clarification(SqlResponse),
}

/// Orchestrator for one gateway instance.
pub struct SqlTool {
    limiter: RateLimiter,
    validator: SqlValidator,
    planner: SqlPlanner,
    executor: QueryExecutor,
    cache: Arc<PlanCache>,
    history: QueryHistory,
    audit: AuditSink,
    confidence_threshold: f64,
}

impl SqlTool {
    /// Assemble a tool from pre-built components.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        limiter: RateLimiter,
        validator: SqlValidator,
        planner: SqlPlanner,
        executor: QueryExecutor,
        cache: Arc<PlanCache>,
        history: QueryHistory,
        audit: AuditSink,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            limiter,
            validator,
            planner,
            executor,
            cache,
            history,
            audit,
            confidence_threshold,
        }
    }

    /// Wire a complete tool from configuration, a database, and a provider.
    pub async fn from_config(
        config: &GatewayConfig,
        db: Database,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, GatewayError> {
        let executor = QueryExecutor::open_read_only(db.path()).await?;
        let breaker = Arc::new(CircuitBreaker::new(&config.breaker));
        let cache = Arc::new(PlanCache::new(&config.cache));
        let history = QueryHistory::new(db.clone(), config.history.retention_days);
        let planner = SqlPlanner::new(
            provider,
            breaker,
            cache.clone(),
            history.clone(),
            Duration::from_secs(config.llm.timeout_seconds),
            config.validator.default_limit,
        );

        Ok(Self::new(
            RateLimiter::new(&config.rate_limit),
            SqlValidator::new(&config.validator)?,
            planner,
            executor,
            cache,
            history,
            AuditSink::new(db),
            config.llm.confidence_threshold,
        ))
    }

    /// Handle one inbound request end to end.
    ///
    /// Exactly one audit record is written per call, on every path, with
    /// the request's wall-clock duration.
    pub async fn run(&self, request: SqlRequest) -> Result<SqlResponse, ErrorEnvelope> {
        let correlation_id = request
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let principal = request
            .user_id
            .clone()
            .unwrap_or_else(|| ANONYMOUS_PRINCIPAL.to_string());

        let input = serde_json::json!({
            "query": request.query,
            "bypass_cache": request.bypass_cache,
        });
        let mut scope = self
            .audit
            .begin("query", &correlation_id, request.user_id.as_deref(), input);

        // Admission comes before any other work so abusers cannot pollute
        // the cache or drain the LLM budget.
        if let Err(e) = self.limiter.check(&principal) {
            scope.failure(&error_output(&e)).await;
            return Err(ErrorEnvelope::from_error(&e, &correlation_id));
        }

        match self.handle(&request, &correlation_id).await {
            Ok(Outcome::Clarification(response)) => {
                scope.set_action("clarification");
                scope.success(&success_output(&response)).await;
                Ok(response)
            }
            Ok(Outcome::Executed(response)) => {
                scope
                    .success_with_usage(
                        &success_output(&response),
                        i64::from(response.tokens_in),
                        i64::from(response.tokens_out),
                        response.cost_usd,
                    )
                    .await;
                Ok(response)
            }
            Err(e) => {
                scope.failure(&error_output(&e)).await;
                Err(ErrorEnvelope::from_error(&e, &correlation_id))
            }
        }
    }

    async fn handle(
        &self,
        request: &SqlRequest,
        correlation_id: &str,
    ) -> Result<Outcome, GatewayError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(GatewayError::Validation {
                reason: "query must be non-empty".into(),
            });
        }
        if request.query.chars().count() > MAX_QUERY_CHARS {
            return Err(GatewayError::Validation {
                reason: format!("query exceeds {MAX_QUERY_CHARS} characters"),
            });
        }

        let (plan, usage) = if is_raw_sql(query) {
            let sanitized = self.validator.validate(query)?;
            let plan = SqlPlan {
                sql: sanitized,
                confidence: 1.0,
                explanation: "Caller-supplied SQL".into(),
                source: PlanSource::Raw,
            };
            (plan, None)
        } else {
            let planned = self
                .planner
                .plan(query, correlation_id, request.user_id.as_deref(), request.bypass_cache)
                .await?;
            (planned.plan, planned.usage)
        };

        // Confidence gate: at or above the threshold passes. Below it the
        // candidate SQL is echoed back for confirmation -- not executed, not
        // cached, not stored.
        if plan.confidence < self.confidence_threshold {
            info!(
                correlation_id,
                confidence = plan.confidence,
                threshold = self.confidence_threshold,
                "confidence below threshold, returning clarification"
            );
            let (tokens_in, tokens_out, cost_usd) = usage_parts(&usage);
            return Ok(Outcome::Clarification(SqlResponse {
                tool_used: "sql".into(),
                confidence: plan.confidence,
                result: None,
                source: plan.source,
                plan,
                trace_id: correlation_id.to_string(),
                tokens_in,
                tokens_out,
                cost_usd,
                notes: Some("low_confidence".into()),
            }));
        }

        // Every plan is re-validated here regardless of source, cache and
        // history included. The post-validator SQL is the only form that
        // executes and the only form that gets persisted.
        let sanitized = self.validator.validate(&plan.sql)?;
        let plan = plan.with_sql(sanitized);

        let exec_started = Instant::now();
        let result = self.executor.execute(&plan.sql).await?;
        let execution_time_ms = exec_started.elapsed().as_millis() as i64;

        let mut notes = match plan.source {
            PlanSource::ShortCache => Some("cache_hit".to_string()),
            PlanSource::History => Some("history_reuse".to_string()),
            _ => None,
        };

        if matches!(plan.source, PlanSource::Llm | PlanSource::History) {
            let (tokens_in, tokens_out, cost_usd) = usage_parts(&usage);
            let result_size_bytes = serde_json::to_string(&result)
                .map(|s| s.len() as i64)
                .unwrap_or(0);
            let entry = NewHistoryEntry {
                natural_language_query: query.to_string(),
                generated_sql: plan.sql.clone(),
                confidence: plan.confidence,
                result_size_bytes,
                row_count: result.row_count as i64,
                execution_time_ms,
                tokens_input: i64::from(tokens_in),
                tokens_output: i64::from(tokens_out),
                cost_usd,
                user_id: request.user_id.clone(),
                correlation_id: Some(correlation_id.to_string()),
            };
            if let Err(e) = self.history.store(entry).await {
                warn!(
                    correlation_id,
                    error = %e,
                    "history write failed after successful execution"
                );
                notes = Some("history_write_failed".to_string());
            }
            if !request.bypass_cache {
                self.cache.set(query, &plan).await;
            }
        }

        let (tokens_in, tokens_out, cost_usd) = usage_parts(&usage);
        Ok(Outcome::Executed(SqlResponse {
            tool_used: "sql".into(),
            confidence: plan.confidence,
            result: Some(result),
            source: plan.source,
            plan,
            trace_id: correlation_id.to_string(),
            tokens_in,
            tokens_out,
            cost_usd,
            notes,
        }))
    }

    /// The audit sink, for read-back by callers and tests.
    pub fn audit(&self) -> &AuditSink {
        &self.audit
    }
}

fn usage_parts(usage: &Option<LlmUsage>) -> (u32, u32, f64) {
    match usage {
        Some(u) => (u.input_tokens, u.output_tokens, u.cost_usd),
        None => (0, 0, 0.0),
    }
}

fn success_output(response: &SqlResponse) -> serde_json::Value {
    serde_json::json!({
        "row_count": response.result.as_ref().map(|r| r.row_count),
        "source": response.source,
        "notes": response.notes,
    })
}

fn error_output(e: &GatewayError) -> serde_json::Value {
    serde_json::json!({
        "error_type": e.error_type(),
        "category": e.category(),
    })
}
