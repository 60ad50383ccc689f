// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM vendor integrations for the sqlgate gateway.
//!
//! Every provider implements [`LlmProvider`]: one structured-generation
//! call returning a schema-validated plan plus token usage and cost. The
//! [`MockProvider`] is the deterministic stand-in used throughout the test
//! suites.
//!
//! [`LlmProvider`]: sqlgate_core::LlmProvider

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod openrouter;
pub mod pricing;
pub mod structured;

pub use anthropic::AnthropicProvider;
pub use mock::{MockOutcome, MockProvider};
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;
pub use pricing::{calculate_cost, get_pricing, ModelPricing};
