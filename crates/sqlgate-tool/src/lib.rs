// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request orchestration for the sqlgate gateway.
//!
//! [`SqlTool`] is what a transport adapter calls: it owns admission control,
//! classification, planning, validation, execution, persistence, and audit
//! for each request, and returns either the structured success envelope or
//! the taxonomy error envelope.

pub mod classifier;
pub mod sql;

pub use classifier::is_raw_sql;
pub use sql::SqlTool;
