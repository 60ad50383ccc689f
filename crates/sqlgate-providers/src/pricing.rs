// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pricing tables and cost calculation.
//!
//! Rates are USD per million tokens, checked against the public vendor
//! pricing pages on 2026-06-01:
//!
//! Claude Haiku:   input=$0.80/MTok, output=$4.00/MTok
//! Claude Sonnet:  input=$3.00/MTok, output=$15.00/MTok
//! Claude Opus:    input=$15.00/MTok, output=$75.00/MTok
//! GPT-4o:         input=$2.50/MTok, output=$10.00/MTok
//! GPT-4o mini:    input=$0.15/MTok, output=$0.60/MTok

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    /// Cost per million input tokens.
    pub input_per_mtok: f64,
    /// Cost per million output tokens.
    pub output_per_mtok: f64,
}

/// Look up pricing for a model identifier.
///
/// Matches on substrings. Unknown models fall back to Sonnet-class pricing
/// so cost tracking never silently drops to zero.
pub fn get_pricing(model: &str) -> ModelPricing {
    let lower = model.to_lowercase();

    if lower.contains("opus") {
        ModelPricing {
            input_per_mtok: 15.0,
            output_per_mtok: 75.0,
        }
    } else if lower.contains("haiku") {
        ModelPricing {
            input_per_mtok: 0.80,
            output_per_mtok: 4.0,
        }
    } else if lower.contains("gpt-4o-mini") {
        ModelPricing {
            input_per_mtok: 0.15,
            output_per_mtok: 0.60,
        }
    } else if lower.contains("gpt-4o") {
        ModelPricing {
            input_per_mtok: 2.50,
            output_per_mtok: 10.0,
        }
    } else {
        // Default to Sonnet-class pricing (including unknown models).
        ModelPricing {
            input_per_mtok: 3.0,
            output_per_mtok: 15.0,
        }
    }
}

/// Cost in USD for the given token counts under `pricing`.
pub fn calculate_cost(input_tokens: u32, output_tokens: u32, pricing: &ModelPricing) -> f64 {
    let input = (input_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok;
    let output = (output_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok;
    input + output
}
