// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenRouter provider.
//!
//! Talks to OpenRouter's chat-completions endpoint with schema-constrained
//! decoding. OpenRouter reports its own cost figure in the usage object;
//! when present it wins over the local pricing table.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use sqlgate_core::{GatewayError, LlmProvider, LlmUsage, PlannerCause, SqlPlan};
use tracing::debug;

use crate::pricing::{calculate_cost, get_pricing};
use crate::structured::{extract_json, plan_response_schema};

/// OpenRouter chat-completions endpoint.
const API_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model when none is configured.
const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// Client for OpenRouter structured generation.
#[derive(Debug)]
pub struct OpenRouterProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OpenRouterProvider {
    /// Build a provider. An empty `model` selects the default.
    pub fn new(api_key: &str, model: &str) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| GatewayError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            model: if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn generate_plan(&self, prompt: &str) -> Result<(SqlPlan, LlmUsage), GatewayError> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "sql_plan",
                    "strict": true,
                    "schema": plan_response_schema(),
                }
            }
        });

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| provider_failure(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        debug!(status = %status, model = %self.model, "openrouter response received");
        let body = response
            .text()
            .await
            .map_err(|e| provider_failure(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(provider_failure(format!("API returned {status}: {body}")));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| provider_failure(format!("failed to parse API response: {e}")))?;

        let content = parsed["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| provider_failure("empty response from OpenRouter".into()))?;

        let plan = SqlPlan::from_json(&extract_json(content)?)?;

        let usage_obj = &parsed["usage"];
        let input_tokens = usage_obj["prompt_tokens"].as_u64().unwrap_or(0) as u32;
        let output_tokens = usage_obj["completion_tokens"].as_u64().unwrap_or(0) as u32;
        let cost_usd = match usage_obj.get("total_cost").and_then(|v| v.as_f64()) {
            Some(cost) => cost,
            None => calculate_cost(input_tokens, output_tokens, &get_pricing(&self.model)),
        };

        Ok((plan, LlmUsage::new(input_tokens, output_tokens, cost_usd)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn provider_failure(message: String) -> GatewayError {
    GatewayError::Planning {
        cause: PlannerCause::ProviderFailure,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: &str) -> OpenRouterProvider {
        OpenRouterProvider::new("sk-or-test", "test/model")
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn success_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "gen-1",
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 40, "total_cost": 0.0007 }
        })
    }

    #[tokio::test]
    async fn conforming_response_becomes_a_plan() {
        let server = MockServer::start().await;
        let content = r#"{"sql": "SELECT region FROM sales_fact LIMIT 200", "confidence": 0.92, "explanation": "Revenue by region"}"#;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("authorization", "Bearer sk-or-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(content)))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let (plan, usage) = provider.generate_plan("show revenue").await.unwrap();
        assert_eq!(plan.sql, "SELECT region FROM sales_fact LIMIT 200");
        assert_eq!(usage.input_tokens, 120);
        assert_eq!(usage.output_tokens, 40);
        // The reported cost wins over the pricing table.
        assert!((usage.cost_usd - 0.0007).abs() < 1e-12);
    }

    #[tokio::test]
    async fn http_error_is_a_retryable_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let err = provider.generate_plan("q").await.unwrap_err();
        assert!(err.retryable());
        assert!(err.to_string().contains("503"), "got: {err}");
    }

    #[tokio::test]
    async fn non_json_content_is_a_schema_violation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(success_body("SELECT * FROM sales_fact")),
            )
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let err = provider.generate_plan("q").await.unwrap_err();
        assert!(!err.retryable());
    }

    #[tokio::test]
    async fn missing_limit_in_plan_is_a_schema_violation() {
        let server = MockServer::start().await;
        let content = r#"{"sql": "SELECT region FROM sales_fact", "confidence": 0.9, "explanation": "no limit"}"#;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(content)))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let err = provider.generate_plan("q").await.unwrap_err();
        assert!(!err.retryable());
        assert!(err.to_string().contains("LIMIT"), "got: {err}");
    }

    #[tokio::test]
    async fn missing_usage_falls_back_to_pricing_table() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{ "message": { "content": r#"{"sql": "SELECT 1 FROM job_runs LIMIT 1", "confidence": 0.8, "explanation": "probe"}"# } }],
            "usage": { "prompt_tokens": 1000, "completion_tokens": 500 }
        });
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let (_, usage) = provider.generate_plan("q").await.unwrap();
        // Unknown model -> Sonnet-class rates: 1000/1M*3 + 500/1M*15.
        let expected = 0.003 + 0.0075;
        assert!((usage.cost_usd - expected).abs() < 1e-10);
    }
}
