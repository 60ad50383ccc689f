// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plan cache: keying, size gating, stats, and graceful degradation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlgate_config::CacheConfig;
use sqlgate_core::{query_hash, SqlPlan};
use tracing::{debug, warn};

use crate::backend::{CacheBackend, MemoryBackend};

/// Cache statistics for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
}

impl CacheStats {
    /// Hit rate over all reads, in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

/// Key-addressed store of recently validated plans.
///
/// Misses are silent; backend errors are logged and degrade to misses.
pub struct PlanCache {
    backend: Arc<dyn CacheBackend>,
    enabled: bool,
    ttl: Duration,
    max_value_bytes: usize,
    counters: Counters,
}

impl PlanCache {
    /// Build a cache over the default in-memory backend.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_backend(config, Arc::new(MemoryBackend::new()))
    }

    /// Build a cache over an explicit backend.
    pub fn with_backend(config: &CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl_seconds),
            max_value_bytes: config.max_value_bytes,
            counters: Counters::default(),
        }
    }

    /// Look up the cached plan for a natural-language query.
    ///
    /// Returns `None` on miss, on a disabled cache, on a backend failure,
    /// and on a corrupt stored value; the last two are counted as errors.
    pub async fn get(&self, query: &str) -> Option<SqlPlan> {
        if !self.enabled {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let key = cache_key(query);
        match self.backend.get(&key).await {
            Ok(Some(serialized)) => match serde_json::from_str::<SqlPlan>(&serialized) {
                Ok(plan) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "plan cache hit");
                    Some(plan)
                }
                Err(e) => {
                    // Corrupt entry: fall through to the origin.
                    warn!(key = %key, error = %e, "discarding corrupt cache entry");
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Cache a validated plan. Returns whether the value was stored.
    ///
    /// Oversized values are skipped (still counted as a set attempt);
    /// backend failures are logged and counted, never propagated.
    pub async fn set(&self, query: &str, plan: &SqlPlan) -> bool {
        if !self.enabled {
            return false;
        }
        self.counters.sets.fetch_add(1, Ordering::Relaxed);

        let serialized = match serde_json::to_string(plan) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to serialize plan for caching");
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        if serialized.len() > self.max_value_bytes {
            debug!(
                size_bytes = serialized.len(),
                max_bytes = self.max_value_bytes,
                "plan too large to cache, skipping"
            );
            return false;
        }

        let key = cache_key(query);
        match self.backend.set(&key, serialized, self.ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "cache write failed");
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Snapshot the hit/miss/set/error counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            sets: self.counters.sets.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}

/// Namespaced cache key for a natural-language query.
fn cache_key(query: &str) -> String {
    format!("sql:{}", query_hash(query))
}
