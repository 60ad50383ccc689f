// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit breaker for the LLM call path.
//!
//! Failures are counted in a sliding wall-clock window. Crossing the
//! threshold opens the circuit; calls then fail fast without touching the
//! provider. After the recovery interval a single half-open probe is
//! admitted; its outcome closes or reopens the circuit.
//!
//! The breaker is process-local. Breakers for distinct LLM routes are
//! independent instances.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sqlgate_config::BreakerConfig;
use sqlgate_core::GatewayError;
use tracing::{info, warn};

/// The three breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation; calls pass through.
    Closed,
    /// Tripped; calls are rejected without being issued.
    Open,
    /// Recovery test; exactly one probe call is admitted.
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time snapshot for observability.
#[derive(Debug, Clone)]
pub struct BreakerStats {
    pub state: BreakerState,
    /// Total failures recorded over the breaker's lifetime.
    pub failure_count: u64,
    /// Total successes recorded over the breaker's lifetime.
    pub success_count: u64,
    /// Failures currently inside the sliding window.
    pub failures_in_window: usize,
}

struct BreakerInner {
    state: BreakerState,
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    failure_count: u64,
    success_count: u64,
}

/// Sliding-window circuit breaker.
///
/// All mutation happens under one internal mutex; the lock is never held
/// across an await point because every operation is synchronous.
pub struct CircuitBreaker {
    failure_threshold: u32,
    window: Duration,
    recovery: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Build a breaker from configuration.
    pub fn new(config: &BreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            window: Duration::from_secs(config.window_seconds),
            recovery: Duration::from_secs(config.recovery_seconds),
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failures: VecDeque::new(),
                opened_at: None,
                probe_in_flight: false,
                failure_count: 0,
                success_count: 0,
            }),
        }
    }

    /// Ask permission to issue a call.
    ///
    /// In `Closed` this always succeeds. In `Open` it fails fast with the
    /// remaining recovery time. In `HalfOpen` exactly one caller is admitted
    /// as the probe; everyone else is rejected until the probe resolves via
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn try_acquire(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        let now = Instant::now();
        self.advance(&mut inner, now);

        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| now.duration_since(t))
                    .unwrap_or_default();
                let retry_after = self.recovery.saturating_sub(elapsed).as_secs_f64();
                Err(GatewayError::CircuitOpen {
                    retry_after_seconds: retry_after,
                })
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(GatewayError::CircuitOpen {
                        retry_after_seconds: 0.0,
                    })
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Record a successful call. Closes the circuit if this was the probe.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.success_count += 1;
        if inner.state == BreakerState::HalfOpen {
            info!("probe succeeded, closing circuit");
            inner.state = BreakerState::Closed;
            inner.failures.clear();
            inner.opened_at = None;
            inner.probe_in_flight = false;
        }
    }

    /// Record a failed call (any error from the wrapped call, timeouts
    /// included). May open the circuit.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        let now = Instant::now();
        inner.failure_count += 1;
        inner.failures.push_back(now);
        self.prune(&mut inner, now);

        match inner.state {
            BreakerState::HalfOpen => {
                warn!("probe failed, reopening circuit");
                inner.state = BreakerState::Open;
                inner.opened_at = Some(now);
                inner.probe_in_flight = false;
            }
            BreakerState::Closed => {
                if inner.failures.len() >= self.failure_threshold as usize {
                    warn!(
                        failures = inner.failures.len(),
                        threshold = self.failure_threshold,
                        "failure threshold breached, opening circuit"
                    );
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(now);
                }
            }
            BreakerState::Open => {}
        }
    }

    /// The breaker's current state, after applying any due open→half-open
    /// transition.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        self.advance(&mut inner, Instant::now());
        inner.state
    }

    /// Snapshot counters for observability.
    pub fn stats(&self) -> BreakerStats {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        let now = Instant::now();
        self.advance(&mut inner, now);
        self.prune(&mut inner, now);
        BreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            failures_in_window: inner.failures.len(),
        }
    }

    /// Transition Open → HalfOpen once the recovery interval has elapsed.
    fn advance(&self, inner: &mut BreakerInner, now: Instant) {
        if inner.state == BreakerState::Open {
            if let Some(opened_at) = inner.opened_at {
                if now.duration_since(opened_at) >= self.recovery {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = false;
                }
            }
        }
    }

    /// Drop failures that have aged out of the sliding window.
    fn prune(&self, inner: &mut BreakerInner, now: Instant) {
        while let Some(front) = inner.failures.front() {
            if now.duration_since(*front) > self.window {
                inner.failures.pop_front();
            } else {
                break;
            }
        }
    }
}
