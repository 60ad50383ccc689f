// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only query execution.
//!
//! The executor holds its own connection opened with read-only flags, so
//! even a validator escape cannot mutate the store. Results are materialized
//! eagerly; the validator's LIMIT guarantee bounds their size. Scalars cross
//! the boundary as JSON values with REAL mapped to floating point.

use sqlgate_core::{GatewayError, TableResult};
use tracing::debug;

/// Executor over a read-only SQLite connection.
pub struct QueryExecutor {
    conn: tokio_rusqlite::Connection,
}

/// Execution failure classified inside the database thread.
#[derive(Debug)]
struct ExecFailure {
    message: String,
    retryable: bool,
}

impl QueryExecutor {
    /// Open a read-only connection to the database at `path`.
    ///
    /// The schema must already exist (the writer side runs migrations).
    pub async fn open_read_only(path: &str) -> Result<Self, GatewayError> {
        let flags = rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
            | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = tokio_rusqlite::Connection::open_with_flags(path, flags)
            .await
            .map_err(|e| GatewayError::Storage {
                source: Box::new(e),
            })?;
        Ok(Self { conn })
    }

    /// Execute an already-validated statement and shape the rows.
    pub async fn execute(&self, sql: &str) -> Result<TableResult, GatewayError> {
        let sql_owned = sql.to_string();
        let outcome = self
            .conn
            .call(
                move |conn: &mut rusqlite::Connection| -> Result<Result<TableResult, ExecFailure>, tokio_rusqlite::Error> {
                    Ok(run_query(conn, &sql_owned))
                },
            )
            .await
            .map_err(|e| GatewayError::Storage {
                source: Box::new(e),
            })?;

        match outcome {
            Ok(result) => {
                debug!(rows = result.row_count, "query executed");
                Ok(result)
            }
            Err(failure) => Err(GatewayError::Execution {
                message: failure.message,
                retryable: failure.retryable,
            }),
        }
    }
}

fn run_query(conn: &rusqlite::Connection, sql: &str) -> Result<TableResult, ExecFailure> {
    let mut stmt = conn.prepare(sql).map_err(classify)?;
    let columns: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let column_count = columns.len();

    let mut rows = stmt.query([]).map_err(classify)?;
    let mut out: Vec<Vec<serde_json::Value>> = Vec::new();
    loop {
        match rows.next() {
            Ok(Some(row)) => {
                let mut record = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value = row.get_ref(i).map_err(classify)?;
                    record.push(value_to_json(value));
                }
                out.push(record);
            }
            Ok(None) => break,
            Err(e) => return Err(classify(e)),
        }
    }

    let row_count = out.len();
    Ok(TableResult {
        columns,
        rows: out,
        row_count,
    })
}

/// Classify a driver error per the retryability matrix: permission-shaped
/// failures are final, transport-shaped ones may be retried.
fn classify(e: rusqlite::Error) -> ExecFailure {
    use rusqlite::ErrorCode;

    let retryable = match &e {
        rusqlite::Error::SqliteFailure(ffi, _) => matches!(
            ffi.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
        ),
        _ => false,
    };
    ExecFailure {
        message: e.to_string(),
        retryable,
    }
}

/// Map one SQLite scalar into the wire representation.
fn value_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
    use rusqlite::types::ValueRef;

    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => {
            serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(b.iter().fold(
            String::with_capacity(b.len() * 2),
            |mut acc, byte| {
                use std::fmt::Write;
                let _ = write!(acc, "{byte:02x}");
                acc
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use tempfile::tempdir;

    async fn setup() -> (QueryExecutor, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exec.db");
        let path_str = path.to_str().unwrap();
        let db = Database::open(path_str).await.unwrap();

        db.connection()
            .call(|conn: &mut rusqlite::Connection| -> Result<(), tokio_rusqlite::Error> {
                conn.execute_batch(
                    "INSERT INTO sales_fact (region, quarter, revenue, units_sold, created_at) VALUES
                        ('North America', 'Q4', 125000.50, 320, '2026-01-10T00:00:00.000Z'),
                        ('Europe', 'Q4', 98000.25, 210, '2026-01-11T00:00:00.000Z'),
                        ('APAC', 'Q3', 67000.00, 150, '2026-01-12T00:00:00.000Z');",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let executor = QueryExecutor::open_read_only(path_str).await.unwrap();
        (executor, db, dir)
    }

    #[tokio::test]
    async fn select_shapes_columns_and_rows() {
        let (executor, db, _dir) = setup().await;
        let result = executor
            .execute("SELECT region, revenue FROM sales_fact WHERE quarter = 'Q4' ORDER BY region LIMIT 200")
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["region", "revenue"]);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows.len(), result.row_count);
        assert_eq!(result.rows[0][0], serde_json::json!("Europe"));
        assert_eq!(result.rows[0][1], serde_json::json!(98000.25));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn aggregates_come_back_as_numbers() {
        let (executor, db, _dir) = setup().await;
        let result = executor
            .execute("SELECT quarter, SUM(revenue) AS total FROM sales_fact GROUP BY quarter ORDER BY quarter LIMIT 200")
            .await
            .unwrap();

        assert_eq!(result.row_count, 2);
        // Q3 total.
        assert_eq!(result.rows[0][1], serde_json::json!(67000.0));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_result_is_zero_rows_with_columns() {
        let (executor, db, _dir) = setup().await;
        let result = executor
            .execute("SELECT region FROM sales_fact WHERE quarter = 'Q9' LIMIT 10")
            .await
            .unwrap();
        assert_eq!(result.row_count, 0);
        assert_eq!(result.columns, vec!["region"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn null_values_map_to_json_null() {
        let (executor, db, _dir) = setup().await;
        db.connection()
            .call(|conn: &mut rusqlite::Connection| -> Result<(), tokio_rusqlite::Error> {
                conn.execute(
                    "INSERT INTO job_runs (job_name, status, started_at, completed_at, records_processed) \
                     VALUES ('etl_daily', 'running', '2026-01-10T00:00:00.000Z', NULL, 0)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let result = executor
            .execute("SELECT job_name, completed_at FROM job_runs LIMIT 10")
            .await
            .unwrap();
        assert_eq!(result.rows[0][1], serde_json::Value::Null);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn writes_fail_on_the_read_only_connection() {
        let (executor, db, _dir) = setup().await;
        // The read-only flags reject writes even with the validator out of
        // the path.
        let err = executor
            .execute("INSERT INTO sales_fact (region, quarter, revenue, units_sold, created_at) VALUES ('X', 'Q1', 1, 1, 'now')")
            .await
            .unwrap_err();
        assert!(!err.retryable());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_column_is_a_final_execution_error() {
        let (executor, db, _dir) = setup().await;
        let err = executor
            .execute("SELECT nonexistent FROM sales_fact LIMIT 1")
            .await
            .unwrap_err();
        match err {
            GatewayError::Execution { retryable, .. } => assert!(!retryable),
            other => panic!("unexpected error: {other}"),
        }
        db.close().await.unwrap();
    }
}
