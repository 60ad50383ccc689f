// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The SQL planner: natural language in, plan out.
//!
//! Read path, in order: short-term cache, query history, LLM (through the
//! timeout wrapper and the circuit breaker). The planner neither validates
//! SQL nor gates on confidence -- both belong to the orchestrator, which
//! keeps the planner reusable on its own.

use std::sync::Arc;
use std::time::Duration;

use sqlgate_cache::PlanCache;
use sqlgate_core::{GatewayError, LlmProvider, LlmUsage, PlanSource, SqlPlan};
use sqlgate_resilience::{with_timeout, CircuitBreaker};
use sqlgate_storage::QueryHistory;
use tracing::{debug, info, warn};

use crate::prompt::build_prompt;

/// A plan plus the LLM spend that produced it (`None` off the LLM path).
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub plan: SqlPlan,
    pub usage: Option<LlmUsage>,
}

/// Orchestrates the three-tier read path for natural-language planning.
pub struct SqlPlanner {
    provider: Arc<dyn LlmProvider>,
    breaker: Arc<CircuitBreaker>,
    cache: Arc<PlanCache>,
    history: QueryHistory,
    timeout: Duration,
    default_limit: u32,
}

impl SqlPlanner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        breaker: Arc<CircuitBreaker>,
        cache: Arc<PlanCache>,
        history: QueryHistory,
        timeout: Duration,
        default_limit: u32,
    ) -> Self {
        Self {
            provider,
            breaker,
            cache,
            history,
            timeout,
            default_limit,
        }
    }

    /// Produce a plan for `nl_query`.
    ///
    /// Timeout and breaker-open failures surface with their own categories;
    /// provider and schema failures surface as planning errors. Store
    /// failures on the read path degrade to the next tier rather than
    /// failing the request.
    pub async fn plan(
        &self,
        nl_query: &str,
        correlation_id: &str,
        _user_id: Option<&str>,
        bypass_cache: bool,
    ) -> Result<PlannedQuery, GatewayError> {
        if !bypass_cache {
            if let Some(plan) = self.cache.get(nl_query).await {
                debug!(correlation_id, "plan served from short-term cache");
                return Ok(PlannedQuery {
                    plan: plan.with_source(PlanSource::ShortCache),
                    usage: None,
                });
            }

            match self.history.lookup(nl_query).await {
                Ok(Some(entry)) => {
                    info!(
                        correlation_id,
                        use_count = entry.use_count,
                        "plan served from query history"
                    );
                    let plan = SqlPlan {
                        sql: entry.generated_sql,
                        confidence: entry.confidence,
                        explanation: "Reused previously validated SQL for this question"
                            .to_string(),
                        source: PlanSource::History,
                    };
                    // Warm the short-term cache so the next repeat skips the
                    // database entirely. The stored SQL already passed
                    // validation when it was first recorded.
                    self.cache.set(nl_query, &plan).await;
                    return Ok(PlannedQuery { plan, usage: None });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(correlation_id, error = %e, "history lookup failed, falling through to LLM");
                }
            }
        }

        self.breaker.try_acquire()?;

        let prompt = build_prompt(nl_query, self.default_limit);
        match with_timeout(self.timeout, self.provider.generate_plan(&prompt)).await {
            Ok((plan, usage)) => {
                self.breaker.record_success();
                info!(
                    correlation_id,
                    model = self.provider.model_name(),
                    confidence = plan.confidence,
                    tokens_in = usage.input_tokens,
                    tokens_out = usage.output_tokens,
                    "plan generated by llm"
                );
                Ok(PlannedQuery {
                    plan,
                    usage: Some(usage),
                })
            }
            Err(e) => {
                // Every failure of the issued call counts toward the
                // breaker, timeouts included. Breaker-open rejections never
                // reach this point.
                self.breaker.record_failure();
                warn!(correlation_id, error = %e, "llm planning failed");
                Err(e)
            }
        }
    }
}
