// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end gateway testing.
//!
//! `TestHarness` assembles a complete [`SqlTool`] stack -- temp SQLite with
//! seeded data tables, mock provider, real breaker/limiter/cache -- and
//! exposes the pieces for assertions. Tests are independent and
//! order-insensitive; each harness owns its own database file.

use std::sync::Arc;
use std::time::Duration;

use sqlgate_cache::PlanCache;
use sqlgate_config::GatewayConfig;
use sqlgate_core::{ErrorEnvelope, GatewayError, SqlRequest, SqlResponse};
use sqlgate_planner::SqlPlanner;
use sqlgate_providers::MockProvider;
use sqlgate_resilience::{CircuitBreaker, RateLimiter};
use sqlgate_storage::{AuditSink, Database, QueryExecutor, QueryHistory};
use sqlgate_tool::SqlTool;
use sqlgate_validator::SqlValidator;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: GatewayConfig,
    default_plan: Option<(String, f64, String)>,
    seed_data: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            default_plan: None,
            seed_data: true,
        }
    }

    /// Replace the whole gateway configuration.
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the mock provider's default plan.
    pub fn with_plan(mut self, sql: &str, confidence: f64, explanation: &str) -> Self {
        self.default_plan = Some((sql.to_string(), confidence, explanation.to_string()));
        self
    }

    /// Skip seeding the sales/job data tables.
    pub fn without_seed_data(mut self) -> Self {
        self.seed_data = false;
        self
    }

    /// Build the harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, GatewayError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| GatewayError::Storage {
            source: e.into(),
        })?;
        let db_path = temp_dir.path().join("gateway.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let db = Database::open(&db_path_str).await?;
        if self.seed_data {
            seed_data_tables(&db).await?;
        }

        let provider = Arc::new(match &self.default_plan {
            Some((sql, confidence, explanation)) => {
                MockProvider::with_plan(sql, *confidence, explanation)
            }
            None => MockProvider::new(),
        });

        let breaker = Arc::new(CircuitBreaker::new(&self.config.breaker));
        let cache = Arc::new(PlanCache::new(&self.config.cache));
        let history = QueryHistory::new(db.clone(), self.config.history.retention_days);
        let audit = AuditSink::new(db.clone());
        let executor = QueryExecutor::open_read_only(&db_path_str).await?;

        let planner = SqlPlanner::new(
            provider.clone(),
            breaker.clone(),
            cache.clone(),
            history.clone(),
            Duration::from_secs(self.config.llm.timeout_seconds),
            self.config.validator.default_limit,
        );

        let tool = SqlTool::new(
            RateLimiter::new(&self.config.rate_limit),
            SqlValidator::new(&self.config.validator)?,
            planner,
            executor,
            cache.clone(),
            history.clone(),
            audit.clone(),
            self.config.llm.confidence_threshold,
        );

        Ok(TestHarness {
            tool,
            provider,
            breaker,
            cache,
            history,
            audit,
            db,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a seeded temp database.
pub struct TestHarness {
    /// The assembled orchestrator under test.
    pub tool: SqlTool,
    /// The mock LLM provider (scriptable, call-counted).
    pub provider: Arc<MockProvider>,
    /// The breaker guarding the mock LLM route.
    pub breaker: Arc<CircuitBreaker>,
    /// The short-term plan cache.
    pub cache: Arc<PlanCache>,
    /// The query-history store.
    pub history: QueryHistory,
    /// The audit sink, for reading records back.
    pub audit: AuditSink,
    /// Writer handle to the temp database.
    pub db: Database,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Run one request as the default test user.
    pub async fn ask(&self, query: &str) -> Result<SqlResponse, ErrorEnvelope> {
        self.ask_as(query, "test-user").await
    }

    /// Run one request as a specific user.
    pub async fn ask_as(&self, query: &str, user: &str) -> Result<SqlResponse, ErrorEnvelope> {
        self.tool
            .run(SqlRequest {
                query: query.to_string(),
                user_id: Some(user.to_string()),
                correlation_id: None,
                bypass_cache: false,
            })
            .await
    }

    /// Run one request with the cache read path bypassed.
    pub async fn ask_bypassing_cache(
        &self,
        query: &str,
    ) -> Result<SqlResponse, ErrorEnvelope> {
        self.tool
            .run(SqlRequest {
                query: query.to_string(),
                user_id: Some("test-user".to_string()),
                correlation_id: None,
                bypass_cache: true,
            })
            .await
    }
}

async fn seed_data_tables(db: &Database) -> Result<(), GatewayError> {
    db.connection()
        .call(|conn: &mut rusqlite::Connection| -> Result<(), tokio_rusqlite::Error> {
            conn.execute_batch(
                "INSERT INTO sales_fact (region, quarter, revenue, units_sold, created_at) VALUES
                    ('North America', 'Q4', 125000.50, 320, '2026-01-10T00:00:00.000Z'),
                    ('Europe', 'Q4', 98000.25, 210, '2026-01-11T00:00:00.000Z'),
                    ('APAC', 'Q3', 67000.00, 150, '2026-01-12T00:00:00.000Z');
                 INSERT INTO job_runs (job_name, status, started_at, completed_at, records_processed) VALUES
                    ('etl_sales_daily', 'success', '2026-01-10T02:00:00.000Z', '2026-01-10T02:12:00.000Z', 45210),
                    ('etl_sales_daily', 'failure', '2026-01-11T02:00:00.000Z', '2026-01-11T02:03:00.000Z', 0),
                    ('etl_audit_sync', 'running', '2026-01-12T02:00:00.000Z', NULL, 0);",
            )?;
            Ok(())
        })
        .await
        .map_err(|e| GatewayError::Storage {
            source: Box::new(e),
        })
}
