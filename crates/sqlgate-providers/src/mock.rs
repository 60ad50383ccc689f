// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider for deterministic testing.
//!
//! Outcomes are popped from a FIFO queue; an empty queue serves the
//! configured default plan. The call counter lets tests assert that a cache
//! or history hit really did avoid an LLM round trip.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlgate_core::{GatewayError, LlmProvider, LlmUsage, PlannerCause, SqlPlan};
use tokio::sync::Mutex;

/// One scripted provider behavior.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return this structured-output JSON (validated like a real response).
    Plan(serde_json::Value),
    /// Fail as a provider failure (HTTP error, empty response, ...).
    ProviderFailure(String),
    /// Fail as a schema violation (non-conforming JSON).
    SchemaViolation(String),
    /// Sleep this long before failing; lets tests exercise the timeout
    /// wrapper and the breaker's timeout accounting.
    Hang(Duration),
}

/// A mock provider with scripted outcomes and a call counter.
#[derive(Debug)]
pub struct MockProvider {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    default_plan: serde_json::Value,
    calls: AtomicU32,
    usage: LlmUsage,
}

impl MockProvider {
    /// Mock with the stock default plan.
    pub fn new() -> Self {
        Self::with_plan(
            "SELECT region, revenue FROM sales_fact LIMIT 200",
            0.9,
            "Lists revenue by region",
        )
    }

    /// Mock whose default response is the given plan.
    pub fn with_plan(sql: &str, confidence: f64, explanation: &str) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_plan: serde_json::json!({
                "sql": sql,
                "confidence": confidence,
                "explanation": explanation,
            }),
            calls: AtomicU32::new(0),
            usage: LlmUsage::new(100, 50, 0.001),
        }
    }

    /// Queue an outcome for a future call.
    pub async fn push(&self, outcome: MockOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// Number of `generate_plan` calls made so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate_plan(&self, _prompt: &str) -> Result<(SqlPlan, LlmUsage), GatewayError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let outcome = self.outcomes.lock().await.pop_front();
        match outcome {
            None => Ok((SqlPlan::from_json(&self.default_plan)?, self.usage)),
            Some(MockOutcome::Plan(value)) => Ok((SqlPlan::from_json(&value)?, self.usage)),
            Some(MockOutcome::ProviderFailure(message)) => Err(GatewayError::Planning {
                cause: PlannerCause::ProviderFailure,
                message,
            }),
            Some(MockOutcome::SchemaViolation(message)) => Err(GatewayError::Planning {
                cause: PlannerCause::SchemaViolation,
                message,
            }),
            Some(MockOutcome::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                Err(GatewayError::Planning {
                    cause: PlannerCause::ProviderFailure,
                    message: "mock hang elapsed".into(),
                })
            }
        }
    }

    fn model_name(&self) -> &str {
        "mock-llm-v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_plan_when_queue_empty() {
        let provider = MockProvider::new();
        let (plan, usage) = provider.generate_plan("anything").await.unwrap();
        assert!(plan.sql.contains("sales_fact"));
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn queued_outcomes_run_in_order() {
        let provider = MockProvider::new();
        provider
            .push(MockOutcome::Plan(serde_json::json!({
                "sql": "SELECT 1 LIMIT 1",
                "confidence": 0.5,
                "explanation": "first",
            })))
            .await;
        provider
            .push(MockOutcome::ProviderFailure("boom".into()))
            .await;

        let (plan, _) = provider.generate_plan("q").await.unwrap();
        assert_eq!(plan.explanation, "first");

        let err = provider.generate_plan("q").await.unwrap_err();
        assert!(err.retryable());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_plan_is_still_schema_checked() {
        let provider = MockProvider::new();
        provider
            .push(MockOutcome::Plan(serde_json::json!({
                "sql": "SELECT 1",
                "confidence": 0.9,
                "explanation": "no limit",
            })))
            .await;
        let err = provider.generate_plan("q").await.unwrap_err();
        assert!(!err.retryable());
    }
}
