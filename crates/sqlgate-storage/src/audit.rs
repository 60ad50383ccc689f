// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit trail.
//!
//! Every gateway operation produces one row carrying SHA-256 digests of its
//! canonicalized input and output; plaintext queries and results never reach
//! audit storage. A failed audit write is logged and swallowed -- the request
//! outcome wins over observability.

use std::time::Instant;

use sqlgate_core::{canonical_hash, now_iso8601, GatewayError};
use tracing::warn;

use crate::database::{map_tr_err, Database};
use crate::models::AuditRecord;

/// The tool name recorded for every gateway operation.
const TOOL: &str = "sql";

/// Writer/reader over the `audit_log` table.
#[derive(Clone)]
pub struct AuditSink {
    db: Database,
}

impl AuditSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert one audit row. Input and output are hashed, never stored.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        action: &str,
        correlation_id: &str,
        user_id: Option<&str>,
        input: &serde_json::Value,
        output: &serde_json::Value,
        success: bool,
        duration_ms: i64,
        tokens_input: i64,
        tokens_output: i64,
        cost_usd: f64,
    ) -> Result<(), GatewayError> {
        let ts = now_iso8601();
        let input_hash = canonical_hash(input);
        let output_hash = canonical_hash(output);
        let action = action.to_string();
        let correlation_id = correlation_id.to_string();
        let user_id = user_id.map(String::from);

        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO audit_log (ts, correlation_id, user_id, tool, action, \
                     input_hash, output_hash, success, duration_ms, tokens_input, \
                     tokens_output, cost_usd) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    rusqlite::params![
                        ts,
                        correlation_id,
                        user_id,
                        TOOL,
                        action,
                        input_hash,
                        output_hash,
                        success,
                        duration_ms,
                        tokens_input,
                        tokens_output,
                        cost_usd,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Start a scoped audit block; the returned scope captures `duration_ms`
    /// from this instant and guarantees one record on whichever exit path
    /// the caller takes.
    pub fn begin(
        &self,
        action: &str,
        correlation_id: &str,
        user_id: Option<&str>,
        input: serde_json::Value,
    ) -> AuditScope<'_> {
        AuditScope {
            sink: self,
            action: action.to_string(),
            correlation_id: correlation_id.to_string(),
            user_id: user_id.map(String::from),
            input,
            started: Instant::now(),
        }
    }

    /// Read back recent audit rows, newest first, optionally filtered by
    /// correlation id.
    pub async fn recent(
        &self,
        correlation_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<AuditRecord>, GatewayError> {
        let correlation_id = correlation_id.map(String::from);
        self.db
            .connection()
            .call(move |conn| {
                let mut records = Vec::new();
                let map_row = |row: &rusqlite::Row<'_>| -> Result<AuditRecord, rusqlite::Error> {
                    Ok(AuditRecord {
                        id: row.get(0)?,
                        ts: row.get(1)?,
                        correlation_id: row.get(2)?,
                        user_id: row.get(3)?,
                        tool: row.get(4)?,
                        action: row.get(5)?,
                        input_hash: row.get(6)?,
                        output_hash: row.get(7)?,
                        success: row.get(8)?,
                        duration_ms: row.get(9)?,
                        tokens_input: row.get(10)?,
                        tokens_output: row.get(11)?,
                        cost_usd: row.get(12)?,
                    })
                };
                match &correlation_id {
                    Some(cid) => {
                        let mut stmt = conn.prepare(
                            "SELECT id, ts, correlation_id, user_id, tool, action, \
                             input_hash, output_hash, success, duration_ms, tokens_input, \
                             tokens_output, cost_usd \
                             FROM audit_log WHERE correlation_id = ?1 \
                             ORDER BY ts DESC, id DESC LIMIT ?2",
                        )?;
                        let rows = stmt.query_map(rusqlite::params![cid, limit], map_row)?;
                        for row in rows {
                            records.push(row?);
                        }
                    }
                    None => {
                        let mut stmt = conn.prepare(
                            "SELECT id, ts, correlation_id, user_id, tool, action, \
                             input_hash, output_hash, success, duration_ms, tokens_input, \
                             tokens_output, cost_usd \
                             FROM audit_log ORDER BY ts DESC, id DESC LIMIT ?1",
                        )?;
                        let rows = stmt.query_map(rusqlite::params![limit], map_row)?;
                        for row in rows {
                            records.push(row?);
                        }
                    }
                }
                Ok(records)
            })
            .await
            .map_err(map_tr_err)
    }
}

/// A pending audit record with automatic timing.
///
/// Consume with [`success`](Self::success),
/// [`success_with_usage`](Self::success_with_usage), or
/// [`failure`](Self::failure). Write errors are logged at `warn` and
/// swallowed.
pub struct AuditScope<'a> {
    sink: &'a AuditSink,
    action: String,
    correlation_id: String,
    user_id: Option<String>,
    input: serde_json::Value,
    started: Instant,
}

impl AuditScope<'_> {
    /// Rename the action recorded at completion (e.g. a planned query that
    /// resolved into a clarification).
    pub fn set_action(&mut self, action: &str) {
        self.action = action.to_string();
    }

    /// Record a successful operation with no LLM spend.
    pub async fn success(self, output: &serde_json::Value) {
        self.finish(output, true, 0, 0, 0.0).await;
    }

    /// Record a successful operation that consumed LLM tokens.
    pub async fn success_with_usage(
        self,
        output: &serde_json::Value,
        tokens_input: i64,
        tokens_output: i64,
        cost_usd: f64,
    ) {
        self.finish(output, true, tokens_input, tokens_output, cost_usd)
            .await;
    }

    /// Record a failed operation.
    pub async fn failure(self, output: &serde_json::Value) {
        self.finish(output, false, 0, 0, 0.0).await;
    }

    async fn finish(
        self,
        output: &serde_json::Value,
        success: bool,
        tokens_input: i64,
        tokens_output: i64,
        cost_usd: f64,
    ) {
        let duration_ms = self.started.elapsed().as_millis() as i64;
        if let Err(e) = self
            .sink
            .record(
                &self.action,
                &self.correlation_id,
                self.user_id.as_deref(),
                &self.input,
                output,
                success,
                duration_ms,
                tokens_input,
                tokens_output,
                cost_usd,
            )
            .await
        {
            warn!(
                correlation_id = %self.correlation_id,
                action = %self.action,
                error = %e,
                "audit write failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (AuditSink, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (AuditSink::new(db.clone()), db, dir)
    }

    #[tokio::test]
    async fn record_inserts_hashed_row() {
        let (sink, db, _dir) = setup().await;
        let input = serde_json::json!({"query": "show revenue"});
        let output = serde_json::json!({"row_count": 3});

        sink.record("query", "corr-1", Some("u1"), &input, &output, true, 12, 10, 5, 0.001)
            .await
            .unwrap();

        let records = sink.recent(Some("corr-1"), 10).await.unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.tool, "sql");
        assert_eq!(rec.action, "query");
        assert!(rec.success);
        assert_eq!(rec.duration_ms, 12);
        assert_eq!(rec.tokens_input, 10);
        // No plaintext in the stored row.
        assert_eq!(rec.input_hash.len(), 64);
        assert!(!rec.input_hash.contains("revenue"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn hashes_depend_only_on_canonical_content() {
        let (sink, db, _dir) = setup().await;
        let input = serde_json::json!({"b": 2, "a": 1});
        let same_input = serde_json::json!({"a": 1, "b": 2});
        let output = serde_json::json!({});

        // Different metadata, same content: hashes must match.
        sink.record("query", "corr-a", Some("u1"), &input, &output, true, 1, 0, 0, 0.0)
            .await
            .unwrap();
        sink.record("query", "corr-b", None, &same_input, &output, false, 99, 0, 0, 0.0)
            .await
            .unwrap();

        let a = &sink.recent(Some("corr-a"), 1).await.unwrap()[0];
        let b = &sink.recent(Some("corr-b"), 1).await.unwrap()[0];
        assert_eq!(a.input_hash, b.input_hash);
        assert_eq!(a.output_hash, b.output_hash);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn scope_records_on_both_paths_with_duration() {
        let (sink, db, _dir) = setup().await;

        let scope = sink.begin("query", "corr-ok", None, serde_json::json!({"q": 1}));
        scope.success(&serde_json::json!({"rows": 2})).await;

        let scope = sink.begin("query", "corr-bad", None, serde_json::json!({"q": 2}));
        scope.failure(&serde_json::json!({"error": "validation"})).await;

        let ok = &sink.recent(Some("corr-ok"), 1).await.unwrap()[0];
        let bad = &sink.recent(Some("corr-bad"), 1).await.unwrap()[0];
        assert!(ok.success);
        assert!(!bad.success);
        assert!(ok.duration_ms >= 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_filters_by_correlation_and_limits() {
        let (sink, db, _dir) = setup().await;
        let v = serde_json::json!({});
        for i in 0..5 {
            sink.record("query", "corr-x", None, &v, &v, true, i, 0, 0, 0.0)
                .await
                .unwrap();
        }
        sink.record("query", "corr-y", None, &v, &v, true, 0, 0, 0, 0.0)
            .await
            .unwrap();

        assert_eq!(sink.recent(Some("corr-x"), 3).await.unwrap().len(), 3);
        assert_eq!(sink.recent(Some("corr-y"), 10).await.unwrap().len(), 1);
        assert_eq!(sink.recent(None, 100).await.unwrap().len(), 6);

        db.close().await.unwrap();
    }
}
