// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fault-tolerance primitives for the sqlgate gateway: per-call timeouts,
//! a circuit breaker guarding the LLM route, and per-principal sliding-window
//! rate limiting.

pub mod breaker;
pub mod rate_limit;
pub mod timeout;

pub use breaker::{BreakerState, BreakerStats, CircuitBreaker};
pub use rate_limit::{RateLimitStats, RateLimiter};
pub use timeout::with_timeout;
