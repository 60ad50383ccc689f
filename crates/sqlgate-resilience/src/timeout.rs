// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock deadline wrapper for LLM calls.
//!
//! On expiry the wrapped future is dropped, which cancels any in-flight
//! request cooperatively. The typed timeout error is returned as-is; policy
//! (breaker accounting, surfacing) belongs to the caller.

use std::future::Future;
use std::time::Duration;

use sqlgate_core::GatewayError;
use tracing::warn;

/// Run `future` under a wall-clock deadline.
///
/// Overruns become [`GatewayError::Timeout`]; the wrapper never swallows or
/// rewrites errors from the future itself.
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_seconds = duration.as_secs_f64(), "call exceeded deadline");
            Err(GatewayError::Timeout { duration })
        }
    }
}
