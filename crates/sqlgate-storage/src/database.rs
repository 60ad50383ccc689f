// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and embedded
//! migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread; the [`Database`] handle IS the single writer. Query modules
//! accept `&Database` and go through `connection().call()`. Do NOT create
//! additional write connections -- the read-only executor opens its own
//! connection with read-only flags, which is the one sanctioned exception.

use sqlgate_core::GatewayError;
use tracing::info;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Convert a tokio-rusqlite error into [`GatewayError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> GatewayError {
    GatewayError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the gateway's SQLite database.
///
/// Cloning is cheap; clones share the one background connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply pragmas, and
    /// run all pending migrations.
    pub async fn open(path: &str) -> Result<Self, GatewayError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| GatewayError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn: &mut rusqlite::Connection| -> Result<(), tokio_rusqlite::Error> {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| {
            embedded::migrations::runner()
                .run(conn)
                .map(|_| ())
                .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))
        })
        .await
        .map_err(|e| GatewayError::Storage {
            source: Box::new(e),
        })?;

        info!(path, "database opened and migrated");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Filesystem path this database was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Close the background connection, flushing pending work.
    pub async fn close(self) -> Result<(), GatewayError> {
        self.conn.close().await.map_err(|e| GatewayError::Storage {
            source: Box::new(e),
        })
    }
}
