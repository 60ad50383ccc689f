// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt construction for SQL generation.

/// Schema description given to the model: the tables it may query and what
/// lives in them. Mirrors the read-only data tables the executor serves.
const DB_SCHEMA_DESCRIPTION: &str = "\
Available Tables:

1. sales_fact
   - id: integer (primary key)
   - region: text - Geographic region (e.g., \"North America\", \"Europe\")
   - quarter: text - Quarter identifier (e.g., \"Q1\", \"Q2\", \"Q3\", \"Q4\")
   - revenue: real - Revenue amount in USD
   - units_sold: integer - Number of units sold
   - created_at: text - Record creation timestamp (ISO 8601)

2. job_runs
   - id: integer (primary key)
   - job_name: text - Name of the ETL job
   - status: text - Job status: 'success', 'failure', or 'running'
   - started_at: text - Job start time (ISO 8601)
   - completed_at: text - Job completion time (null if running)
   - records_processed: integer - Number of records processed

3. audit_log (read-only)
   - id: integer (primary key)
   - ts: text - Timestamp of the operation (ISO 8601)
   - correlation_id: text - Correlation ID for tracing
   - user_id: text - User who performed the operation
   - tool: text - Tool used
   - action: text - Action performed
   - input_hash: text - SHA-256 hash of input
   - output_hash: text - SHA-256 hash of output
   - success: integer - Whether the operation succeeded (0/1)
   - duration_ms: integer - Duration in milliseconds

Allowed Tables: sales_fact, job_runs, audit_log";

/// Build the generation prompt for a natural-language question.
pub fn build_prompt(query: &str, default_limit: u32) -> String {
    format!(
        "You are a SQL query generator for a SQLite database.

DATABASE SCHEMA:
{DB_SCHEMA_DESCRIPTION}

SAFETY RULES (CRITICAL):
1. You MUST include a LIMIT clause in every query (default: LIMIT {default_limit})
2. Only use SELECT statements (no INSERT, UPDATE, DELETE, DROP, etc.)
3. Only query the allowed tables listed above
4. Use proper SQLite syntax

USER QUERY:
{query}

TASK:
Generate a safe SQL query that answers the user's question.

REQUIREMENTS:
- Return a valid SQLite SELECT query
- Include a LIMIT clause (required for safety)
- Provide a confidence score (0.0-1.0) based on query clarity
- Explain what the SQL does in plain English

If the query is unclear or cannot be safely translated to SQL, use a low \
confidence score (below 0.7) and explain why in the explanation field."
    )
}
