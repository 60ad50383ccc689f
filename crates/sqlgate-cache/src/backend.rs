// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache backend abstraction and the default in-memory implementation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlgate_core::GatewayError;
use tokio::sync::Mutex;

/// A key/value store with per-entry TTL.
///
/// Backends may live across a network (the interface is async for that
/// reason); errors from a backend are contained by [`PlanCache`] and never
/// surface to a request.
///
/// [`PlanCache`]: crate::store::PlanCache
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the value at `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError>;

    /// Store `value` at `key` for `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), GatewayError>;
}

/// In-process backend: a map of values with expiry instants.
///
/// Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet swept) entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), GatewayError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let backend = MemoryBackend::new();
        backend
            .set("k", "v".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let backend = MemoryBackend::new();
        assert!(backend.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_dropped_on_read() {
        let backend = MemoryBackend::new();
        backend
            .set("k", "v".into(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(backend.get("k").await.unwrap().is_none());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn overwrite_replaces_value_and_ttl() {
        let backend = MemoryBackend::new();
        backend
            .set("k", "old".into(), Duration::from_millis(10))
            .await
            .unwrap();
        backend
            .set("k", "new".into(), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("new"));
    }
}
