// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw-SQL vs natural-language classification.

/// Statement verbs that mark an input as raw SQL -- valid ones (SELECT,
/// WITH) and forbidden ones alike, so that a pasted `DROP TABLE` goes to
/// the validator for a proper rejection instead of to the planner.
const SQL_VERBS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
    "GRANT", "REVOKE", "WITH", "COPY",
];

/// True when the trimmed input starts with a SQL statement verb.
pub fn is_raw_sql(query: &str) -> bool {
    let upper = query.trim().to_uppercase();
    SQL_VERBS.iter().any(|verb| upper.starts_with(verb))
}
