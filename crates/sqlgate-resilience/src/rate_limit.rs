// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window rate limiting keyed by principal.
//!
//! The limiter sits at the very front of the request path, before cache
//! lookups, LLM calls, or SQL execution, so an abusive caller cannot pollute
//! the cache or drain the LLM budget. Each key tracks the monotonic
//! timestamps of its admitted requests within the window.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sqlgate_config::RateLimitConfig;
use sqlgate_core::GatewayError;
use tracing::debug;

/// Admission statistics for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitStats {
    pub total_requests: u64,
    pub allowed_requests: u64,
    pub rejected_requests: u64,
    pub unique_keys: usize,
}

impl RateLimitStats {
    /// Fraction of requests rejected, in [0, 1].
    pub fn rejection_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.rejected_requests as f64 / self.total_requests as f64
    }
}

struct LimiterInner {
    windows: HashMap<String, VecDeque<Instant>>,
    total_requests: u64,
    allowed_requests: u64,
    rejected_requests: u64,
}

/// Per-key sliding-window admission control.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    inner: Mutex<LimiterInner>,
}

impl RateLimiter {
    /// Build a limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_seconds),
            inner: Mutex::new(LimiterInner {
                windows: HashMap::new(),
                total_requests: 0,
                allowed_requests: 0,
                rejected_requests: 0,
            }),
        }
    }

    /// Admit or reject one request for `key`, recording it when admitted.
    ///
    /// Rejections carry `retry_after_seconds`: the time until the oldest
    /// request still inside the window ages out.
    pub fn check(&self, key: &str) -> Result<(), GatewayError> {
        let mut guard = self.inner.lock().expect("rate limiter lock poisoned");
        let inner = &mut *guard;
        let now = Instant::now();
        inner.total_requests += 1;

        let window = self.window;
        let timestamps = inner.windows.entry(key.to_string()).or_default();
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) > window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_requests as usize {
            let oldest = *timestamps.front().expect("non-empty window");
            let retry_after = window
                .saturating_sub(now.duration_since(oldest))
                .as_secs_f64();
            inner.rejected_requests += 1;
            debug!(key, retry_after, "rate limit exceeded");
            return Err(GatewayError::RateLimit {
                key: key.to_string(),
                limit: self.max_requests,
                window_seconds: window.as_secs(),
                retry_after_seconds: retry_after,
            });
        }

        timestamps.push_back(now);
        inner.allowed_requests += 1;
        Ok(())
    }

    /// Snapshot admission counters.
    pub fn stats(&self) -> RateLimitStats {
        let inner = self.inner.lock().expect("rate limiter lock poisoned");
        RateLimitStats {
            total_requests: inner.total_requests,
            allowed_requests: inner.allowed_requests,
            rejected_requests: inner.rejected_requests,
            unique_keys: inner.windows.len(),
        }
    }

    /// Forget all recorded requests for `key`.
    pub fn clear(&self, key: &str) {
        let mut inner = self.inner.lock().expect("rate limiter lock poisoned");
        inner.windows.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlgate_core::ErrorCategory;

    fn limiter(max: u32, window_ms: u64) -> RateLimiter {
        RateLimiter {
            max_requests: max,
            window: Duration::from_millis(window_ms),
            inner: Mutex::new(LimiterInner {
                windows: HashMap::new(),
                total_requests: 0,
                allowed_requests: 0,
                rejected_requests: 0,
            }),
        }
    }

    #[test]
    fn admits_up_to_the_limit_then_rejects() {
        let l = limiter(3, 60_000);
        assert!(l.check("u1").is_ok());
        assert!(l.check("u1").is_ok());
        assert!(l.check("u1").is_ok());

        let err = l.check("u1").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::RateLimit);
        assert!(err.retryable());
        match err {
            GatewayError::RateLimit {
                retry_after_seconds,
                limit,
                ..
            } => {
                assert!(retry_after_seconds > 0.0);
                assert_eq!(limit, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn keys_are_independent() {
        let l = limiter(1, 60_000);
        assert!(l.check("u1").is_ok());
        assert!(l.check("u2").is_ok());
        assert!(l.check("u1").is_err());
        assert!(l.check("u2").is_err());
    }

    #[test]
    fn window_expiry_readmits() {
        let l = limiter(1, 30);
        assert!(l.check("u1").is_ok());
        assert!(l.check("u1").is_err());
        std::thread::sleep(Duration::from_millis(60));
        assert!(l.check("u1").is_ok());
    }

    #[test]
    fn rejected_requests_are_not_recorded() {
        let l = limiter(2, 60_000);
        l.check("u1").unwrap();
        l.check("u1").unwrap();
        // Three rejections must not extend the window occupancy.
        for _ in 0..3 {
            assert!(l.check("u1").is_err());
        }
        let stats = l.stats();
        assert_eq!(stats.allowed_requests, 2);
        assert_eq!(stats.rejected_requests, 3);
        assert_eq!(stats.total_requests, 5);
    }

    #[test]
    fn stats_track_unique_keys_and_rates() {
        let l = limiter(1, 60_000);
        l.check("a").unwrap();
        l.check("b").unwrap();
        let _ = l.check("a");
        let stats = l.stats();
        assert_eq!(stats.unique_keys, 2);
        assert!((stats.rejection_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn clear_forgets_a_key() {
        let l = limiter(1, 60_000);
        l.check("u1").unwrap();
        assert!(l.check("u1").is_err());
        l.clear("u1");
        assert!(l.check("u1").is_ok());
    }

    #[test]
    fn default_config_allows_100_per_window() {
        let l = RateLimiter::new(&RateLimitConfig::default());
        for i in 0..100 {
            assert!(l.check("user").is_ok(), "request {i} should be admitted");
        }
        assert!(l.check("user").is_err(), "101st request must be rejected");
    }
}
