// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured-output helpers shared by the vendor integrations.

use sqlgate_core::{GatewayError, PlannerCause};

/// JSON Schema for the plan the model must return.
///
/// Sent to vendors that support schema-constrained decoding; also the
/// contract [`SqlPlan::from_json`] enforces on whatever comes back.
///
/// [`SqlPlan::from_json`]: sqlgate_core::SqlPlan::from_json
pub fn plan_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "sql": {
                "type": "string",
                "description": "A single SELECT statement including a LIMIT clause"
            },
            "confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
                "description": "Confidence that the SQL answers the question"
            },
            "explanation": {
                "type": "string",
                "description": "Plain-English description of what the SQL does"
            }
        },
        "required": ["sql", "confidence", "explanation"],
        "additionalProperties": false
    })
}

/// Parse a model's text answer as JSON, tolerating a markdown code fence.
///
/// Models occasionally wrap their JSON in ```` ```json ```` fences even when
/// told not to; stripping the fence is cheap and loses nothing. Anything
/// that still fails to parse is a schema violation.
pub fn extract_json(content: &str) -> Result<serde_json::Value, GatewayError> {
    let trimmed = content.trim();
    let stripped = strip_code_fence(trimmed);

    serde_json::from_str(stripped).map_err(|e| GatewayError::Planning {
        cause: PlannerCause::SchemaViolation,
        message: format!("response is not valid JSON: {e}"),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json", "sql", ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").map_or(body, str::trim)
}
