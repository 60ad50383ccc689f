// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider trait for LLM vendor integrations.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{LlmUsage, SqlPlan};

/// A remote model capable of structured SQL-plan generation.
///
/// Implementations send the prompt with an instruction to answer in JSON
/// conforming to the plan schema, parse and validate the response, and
/// report token usage and cost. A response that cannot be parsed into a
/// conforming plan is a schema violation, not something to retry in the
/// same request.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Generate a plan for the given prompt.
    async fn generate_plan(&self, prompt: &str) -> Result<(SqlPlan, LlmUsage), GatewayError>;

    /// The model identifier in use (e.g. `"claude-sonnet-4-20250514"`).
    fn model_name(&self) -> &str;
}
