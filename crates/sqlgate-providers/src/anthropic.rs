// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API provider.
//!
//! Claude has no schema-constrained decoding mode on this endpoint; the
//! system prompt demands bare JSON and the response is validated against
//! the plan schema like every other vendor's.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use sqlgate_core::{GatewayError, LlmProvider, LlmUsage, PlannerCause, SqlPlan};
use tracing::debug;

use crate::pricing::{calculate_cost, get_pricing};
use crate::structured::extract_json;

/// Base URL for the Anthropic Messages API.
const API_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Default model when none is configured.
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// System instruction demanding schema-conforming JSON output.
const SYSTEM_PROMPT: &str = "You are a SQL planning assistant. Respond with a single JSON \
object with exactly these fields: \"sql\" (a SELECT statement including a LIMIT clause), \
\"confidence\" (a number from 0.0 to 1.0), \"explanation\" (a short plain-English \
description). Output only the JSON object, no prose and no markdown.";

/// Client for Anthropic structured generation.
#[derive(Debug)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicProvider {
    /// Build a provider. An empty `model` selects the default.
    pub fn new(api_key: &str, model: &str, max_tokens: u32) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| GatewayError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
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
            max_tokens,
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
impl LlmProvider for AnthropicProvider {
    async fn generate_plan(&self, prompt: &str) -> Result<(SqlPlan, LlmUsage), GatewayError> {
        let payload = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| provider_failure(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        debug!(status = %status, model = %self.model, "anthropic response received");
        let body = response
            .text()
            .await
            .map_err(|e| provider_failure(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(api_err) => format!(
                    "Anthropic API error ({}): {}",
                    api_err["error"]["type"].as_str().unwrap_or("unknown"),
                    api_err["error"]["message"].as_str().unwrap_or(&body),
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(provider_failure(message));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| provider_failure(format!("failed to parse API response: {e}")))?;

        let content = parsed["content"]
            .get(0)
            .and_then(|block| block["text"].as_str())
            .ok_or_else(|| provider_failure("empty response from Anthropic".into()))?;

        let plan = SqlPlan::from_json(&extract_json(content)?)?;

        let input_tokens = parsed["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32;
        let output_tokens = parsed["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32;
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
