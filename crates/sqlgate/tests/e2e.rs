// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete gateway pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite, the mock
//! provider, and all required subsystems. Tests are independent and
//! order-insensitive.

use std::time::Duration;

use sqlgate_config::GatewayConfig;
use sqlgate_core::{ErrorCategory, PlanSource};
use sqlgate_providers::MockOutcome;
use sqlgate_resilience::BreakerState;
use sqlgate_test_utils::TestHarness;

const Q4_QUESTION: &str = "Show me Q4 revenue by region";
const Q4_SQL: &str =
    "SELECT region, SUM(revenue) FROM sales_fact WHERE quarter = 'Q4' GROUP BY region LIMIT 200";

fn q4_harness_builder() -> sqlgate_test_utils::TestHarnessBuilder {
    TestHarness::builder().with_plan(Q4_SQL, 0.92, "Aggregates Q4 revenue by region")
}

// ---- Scenario 1: successful natural-language request ----

#[tokio::test]
async fn nl_success_executes_persists_and_audits() {
    let harness = q4_harness_builder().build().await.unwrap();

    let response = harness.ask(Q4_QUESTION).await.unwrap();
    assert_eq!(response.tool_used, "sql");
    assert_eq!(response.source, PlanSource::Llm);
    assert!((response.confidence - 0.92).abs() < f64::EPSILON);

    let result = response.result.expect("executed result");
    assert_eq!(result.row_count, 2);
    assert_eq!(result.columns.len(), 2);

    // History entry created.
    let hash = sqlgate_core::query_hash(Q4_QUESTION);
    let entry = harness.history.get_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(entry.generated_sql, Q4_SQL);
    assert_eq!(entry.use_count, 1);
    assert_eq!(entry.row_count, 2);

    // Cache entry created.
    assert!(harness.cache.get(Q4_QUESTION).await.is_some());

    // One successful audit record threaded with the response's trace id.
    let records = harness.audit.recent(Some(&response.trace_id), 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert_eq!(records[0].action, "query");
}

// ---- Scenario 2: repeat question, both reuse tiers ----

#[tokio::test]
async fn repeat_question_hits_short_cache_with_no_second_llm_call() {
    let harness = q4_harness_builder().build().await.unwrap();

    let first = harness.ask(Q4_QUESTION).await.unwrap();
    assert_eq!(first.source, PlanSource::Llm);
    assert_eq!(harness.provider.call_count(), 1);

    let second = harness.ask(Q4_QUESTION).await.unwrap();
    assert_eq!(second.source, PlanSource::ShortCache);
    assert_eq!(second.notes.as_deref(), Some("cache_hit"));
    assert_eq!(second.tokens_in, 0);
    assert_eq!(second.cost_usd, 0.0);
    assert_eq!(harness.provider.call_count(), 1, "no LLM call on the repeat");
}

#[tokio::test]
async fn repeat_question_falls_back_to_history_when_cache_disabled() {
    let mut config = GatewayConfig::default();
    config.cache.enabled = false;
    let harness = q4_harness_builder().with_config(config).build().await.unwrap();

    let first = harness.ask(Q4_QUESTION).await.unwrap();
    assert_eq!(first.source, PlanSource::Llm);

    let second = harness.ask(Q4_QUESTION).await.unwrap();
    assert_eq!(second.source, PlanSource::History);
    assert_eq!(second.notes.as_deref(), Some("history_reuse"));
    assert_eq!(harness.provider.call_count(), 1);

    // The lookup and the post-execution upsert both bumped the counter.
    let hash = sqlgate_core::query_hash(Q4_QUESTION);
    let entry = harness.history.get_by_hash(&hash).await.unwrap().unwrap();
    assert!(entry.use_count >= 2, "got use_count {}", entry.use_count);
}

// ---- Scenario 3: raw DROP is rejected ----

#[tokio::test]
async fn raw_drop_statement_is_rejected_without_execution() {
    let harness = q4_harness_builder().build().await.unwrap();

    let envelope = harness.ask("DROP TABLE audit_log").await.unwrap_err();
    assert_eq!(envelope.category, ErrorCategory::Validation);
    assert!(!envelope.retryable);
    assert!(envelope.message.contains("DROP"), "got: {}", envelope.message);

    let records = harness
        .audit
        .recent(Some(&envelope.correlation_id), 10)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
    assert_eq!(harness.provider.call_count(), 0);
}

// ---- Scenario 4: unsafe LLM output dies at revalidation ----

#[tokio::test]
async fn injection_attempt_from_llm_is_rejected_and_breaker_untouched() {
    let harness = q4_harness_builder().build().await.unwrap();
    harness
        .provider
        .push(MockOutcome::Plan(serde_json::json!({
            "sql": "SELECT * FROM sales_fact; DROP TABLE audit_log LIMIT 10",
            "confidence": 0.99,
            "explanation": "definitely fine",
        })))
        .await;

    let envelope = harness.ask("sneaky question").await.unwrap_err();
    assert_eq!(envelope.category, ErrorCategory::Validation);
    assert!(envelope.message.contains("semicolon"), "got: {}", envelope.message);

    // A safety rejection is not a provider failure.
    let stats = harness.breaker.stats();
    assert_eq!(stats.failure_count, 0);
    assert_eq!(stats.state, BreakerState::Closed);

    let records = harness
        .audit
        .recent(Some(&envelope.correlation_id), 10)
        .await
        .unwrap();
    assert!(!records[0].success);

    // Nothing was cached for the poisonous question.
    assert!(harness.cache.get("sneaky question").await.is_none());
}

// ---- Scenario 5: low confidence becomes a clarification ----

#[tokio::test]
async fn low_confidence_plan_is_echoed_not_executed() {
    let harness = q4_harness_builder().build().await.unwrap();
    harness
        .provider
        .push(MockOutcome::Plan(serde_json::json!({
            "sql": "SELECT region FROM sales_fact LIMIT 200",
            "confidence": 0.45,
            "explanation": "ambiguous question",
        })))
        .await;

    let response = harness.ask("vague thing?").await.unwrap();
    assert_eq!(response.notes.as_deref(), Some("low_confidence"));
    assert!(response.result.is_none());
    assert_eq!(response.plan.sql, "SELECT region FROM sales_fact LIMIT 200");
    assert_eq!(response.plan.explanation, "ambiguous question");

    // No cache write, no history write.
    assert!(harness.cache.get("vague thing?").await.is_none());
    let hash = sqlgate_core::query_hash("vague thing?");
    assert!(harness.history.get_by_hash(&hash).await.unwrap().is_none());

    // Audited as a successful clarification.
    let records = harness
        .audit
        .recent(Some(&response.trace_id), 10)
        .await
        .unwrap();
    assert_eq!(records[0].action, "clarification");
    assert!(records[0].success);
}

// ---- Scenario 6: breaker trips on timeouts, recovers via probe ----

#[tokio::test]
async fn five_timeouts_open_the_breaker_and_a_probe_recloses_it() {
    let mut config = GatewayConfig::default();
    config.llm.timeout_seconds = 1;
    config.breaker.recovery_seconds = 1;
    let harness = q4_harness_builder().with_config(config).build().await.unwrap();

    for _ in 0..5 {
        harness
            .provider
            .push(MockOutcome::Hang(Duration::from_secs(30)))
            .await;
    }

    for i in 0..5 {
        let envelope = harness.ask(&format!("slow question {i}")).await.unwrap_err();
        assert_eq!(envelope.category, ErrorCategory::Timeout, "request {i}");
        assert!(envelope.retryable);
    }
    assert_eq!(harness.breaker.state(), BreakerState::Open);

    // Sixth request fails fast without reaching the provider.
    let calls_before = harness.provider.call_count();
    let envelope = harness.ask("question six").await.unwrap_err();
    assert_eq!(envelope.category, ErrorCategory::CircuitBreaker);
    assert!(envelope.details["retry_after_seconds"].as_f64().is_some());
    assert_eq!(harness.provider.call_count(), calls_before);

    // After the recovery window a single probe goes through; its success
    // closes the circuit and traffic flows again.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    let probe = harness.ask("probe question").await.unwrap();
    assert_eq!(probe.source, PlanSource::Llm);
    assert_eq!(harness.breaker.state(), BreakerState::Closed);

    let after = harness.ask("followup question").await.unwrap();
    assert!(after.result.is_some());
}

// ---- Scenario 7: the 101st request is rate limited ----

#[tokio::test]
async fn hundred_and_first_request_is_rejected_before_downstream_work() {
    let harness = q4_harness_builder().build().await.unwrap();

    for _ in 0..100 {
        harness
            .ask("SELECT region FROM sales_fact LIMIT 1")
            .await
            .unwrap();
    }

    let envelope = harness.ask(Q4_QUESTION).await.unwrap_err();
    assert_eq!(envelope.category, ErrorCategory::RateLimit);
    assert!(envelope.retryable);
    assert!(envelope.details["retry_after_seconds"].as_f64().unwrap() > 0.0);
    assert_eq!(harness.provider.call_count(), 0, "no downstream call was made");

    // A different principal is unaffected.
    let other = harness
        .ask_as("SELECT region FROM sales_fact LIMIT 1", "someone-else")
        .await;
    assert!(other.is_ok());
}

// ---- Reuse law: bypass_cache on both requests means two LLM calls ----

#[tokio::test]
async fn bypassing_cache_twice_costs_two_llm_calls_but_history_converges() {
    let harness = q4_harness_builder().build().await.unwrap();

    harness.ask_bypassing_cache(Q4_QUESTION).await.unwrap();
    harness.ask_bypassing_cache(Q4_QUESTION).await.unwrap();
    assert_eq!(harness.provider.call_count(), 2);

    // Both writes upserted the same entry.
    let hash = sqlgate_core::query_hash(Q4_QUESTION);
    let entry = harness.history.get_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(entry.generated_sql, Q4_SQL);
    assert_eq!(entry.use_count, 2);
}

// ---- Correlation threading ----

#[tokio::test]
async fn caller_supplied_correlation_id_threads_through_everything() {
    let harness = q4_harness_builder().build().await.unwrap();

    let response = harness
        .tool
        .run(sqlgate_core::SqlRequest {
            query: Q4_QUESTION.to_string(),
            user_id: Some("trace-user".to_string()),
            correlation_id: Some("corr-fixed-123".to_string()),
            bypass_cache: false,
        })
        .await
        .unwrap();

    assert_eq!(response.trace_id, "corr-fixed-123");

    let records = harness.audit.recent(Some("corr-fixed-123"), 10).await.unwrap();
    assert_eq!(records.len(), 1);

    let hash = sqlgate_core::query_hash(Q4_QUESTION);
    let entry = harness.history.get_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(entry.correlation_id.as_deref(), Some("corr-fixed-123"));
}
