// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-retention query history.
//!
//! The second tier of the read path: consulted after the short-term cache
//! and before the LLM. Entries are keyed by the hash of the normalized
//! natural-language query. The first validated SQL for a query wins; later
//! stores of the same query only bump the reuse bookkeeping, which keeps the
//! library stable under races between concurrent first-time requests.

use sqlgate_core::{now_iso8601, query_hash, GatewayError};
use tracing::{debug, info};

use crate::database::{map_tr_err, Database};
use crate::models::{HistoryEntry, NewHistoryEntry};

const SELECT_COLUMNS: &str = "query_hash, natural_language_query, generated_sql, confidence, \
     result_size_bytes, row_count, execution_time_ms, tokens_input, tokens_output, \
     cost_usd, user_id, correlation_id, created_at, last_used_at, use_count, expires_at";

/// Store of successful natural-language → validated-SQL mappings.
#[derive(Clone)]
pub struct QueryHistory {
    db: Database,
    retention_days: u32,
}

impl QueryHistory {
    pub fn new(db: Database, retention_days: u32) -> Self {
        Self { db, retention_days }
    }

    /// Look up a non-expired entry for `nl_query`.
    ///
    /// A hit atomically increments `use_count` and refreshes `last_used_at`
    /// in the same statement; no other field changes.
    pub async fn lookup(&self, nl_query: &str) -> Result<Option<HistoryEntry>, GatewayError> {
        let hash = query_hash(nl_query);
        let now = now_iso8601();

        let entry = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "UPDATE query_history \
                     SET use_count = use_count + 1, last_used_at = ?1 \
                     WHERE query_hash = ?2 AND expires_at > ?1 \
                     RETURNING {SELECT_COLUMNS}"
                ))?;
                let result = stmt.query_row(rusqlite::params![now, hash], row_to_entry);
                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(map_tr_err)?;

        if let Some(entry) = &entry {
            debug!(
                query_hash = %entry.query_hash,
                use_count = entry.use_count,
                "query history hit"
            );
        }
        Ok(entry)
    }

    /// Upsert an entry keyed by the hash of its normalized query.
    ///
    /// On conflict the stored SQL is kept and only `last_used_at`,
    /// `use_count`, and `expires_at` move, so a race between two first-time
    /// requests for the same query resolves to one stable entry.
    pub async fn store(&self, entry: NewHistoryEntry) -> Result<(), GatewayError> {
        let hash = query_hash(&entry.natural_language_query);
        let now = now_iso8601();
        let expires_at = expiry_from(&now, self.retention_days)?;

        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO query_history (query_hash, natural_language_query, \
                     generated_sql, confidence, result_size_bytes, row_count, \
                     execution_time_ms, tokens_input, tokens_output, cost_usd, user_id, \
                     correlation_id, created_at, last_used_at, use_count, expires_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13, 1, ?14) \
                     ON CONFLICT(query_hash) DO UPDATE SET \
                         last_used_at = excluded.last_used_at, \
                         use_count = query_history.use_count + 1, \
                         expires_at = excluded.expires_at",
                    rusqlite::params![
                        hash,
                        entry.natural_language_query,
                        entry.generated_sql,
                        entry.confidence,
                        entry.result_size_bytes,
                        entry.row_count,
                        entry.execution_time_ms,
                        entry.tokens_input,
                        entry.tokens_output,
                        entry.cost_usd,
                        entry.user_id,
                        entry.correlation_id,
                        now,
                        expires_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Fetch an entry by its key hash without touching reuse bookkeeping.
    pub async fn get_by_hash(&self, hash: &str) -> Result<Option<HistoryEntry>, GatewayError> {
        let hash = hash.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM query_history WHERE query_hash = ?1"
                ))?;
                let result = stmt.query_row(rusqlite::params![hash], row_to_entry);
                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    /// Delete all expired entries. Invoked by an external scheduler.
    pub async fn cleanup(&self) -> Result<u64, GatewayError> {
        let now = now_iso8601();
        let deleted = self
            .db
            .connection()
            .call(move |conn| {
                let deleted =
                    conn.execute("DELETE FROM query_history WHERE expires_at <= ?1", [now])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(map_tr_err)?;

        info!(deleted, "expired history entries removed");
        Ok(deleted)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<HistoryEntry, rusqlite::Error> {
    Ok(HistoryEntry {
        query_hash: row.get(0)?,
        natural_language_query: row.get(1)?,
        generated_sql: row.get(2)?,
        confidence: row.get(3)?,
        result_size_bytes: row.get(4)?,
        row_count: row.get(5)?,
        execution_time_ms: row.get(6)?,
        tokens_input: row.get(7)?,
        tokens_output: row.get(8)?,
        cost_usd: row.get(9)?,
        user_id: row.get(10)?,
        correlation_id: row.get(11)?,
        created_at: row.get(12)?,
        last_used_at: row.get(13)?,
        use_count: row.get(14)?,
        expires_at: row.get(15)?,
    })
}

/// `created_at + retention_days`, in the shared timestamp format.
fn expiry_from(created_at: &str, retention_days: u32) -> Result<String, GatewayError> {
    let created = chrono::DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| GatewayError::Config(format!("bad timestamp '{created_at}': {e}")))?;
    let expires = created + chrono::Duration::days(i64::from(retention_days));
    Ok(expires
        .with_timezone(&chrono::Utc)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string())
}
