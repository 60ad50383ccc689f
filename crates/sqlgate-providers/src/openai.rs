// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI chat-completions provider with schema-constrained decoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use sqlgate_core::{GatewayError, LlmProvider, LlmUsage, PlannerCause, SqlPlan};
use tracing::debug;

use crate::pricing::{calculate_cost, get_pricing};
use crate::structured::{extract_json, plan_response_schema};

/// OpenAI chat-completions endpoint.
const API_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default model when none is configured.
const DEFAULT_MODEL: &str = "gpt-4o";

/// Client for OpenAI structured generation.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
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
impl LlmProvider for OpenAiProvider {
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
        debug!(status = %status, model = %self.model, "openai response received");
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
            .ok_or_else(|| provider_failure("empty response from OpenAI".into()))?;

        let plan = SqlPlan::from_json(&extract_json(content)?)?;

        let input_tokens = parsed["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32;
        let output_tokens = parsed["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32;
        let cost_usd = calculate_cost(input_tokens, output_tokens, &get_pricing(&self.model));

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
