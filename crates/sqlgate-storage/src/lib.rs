// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the sqlgate gateway.
//!
//! One writer [`Database`] (WAL mode, embedded migrations) serves the audit
//! trail and the query history; the [`QueryExecutor`] opens a separate
//! read-only connection for serving validated SELECTs.

pub mod audit;
pub mod database;
pub mod executor;
pub mod history;
pub mod models;

pub use audit::{AuditScope, AuditSink};
pub use database::Database;
pub use executor::QueryExecutor;
pub use history::QueryHistory;
pub use models::{AuditRecord, HistoryEntry, NewHistoryEntry};
