// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sqlgate - a safe LLM-to-SQL gateway.
//!
//! This binary is a thin inbound adapter over the core: it loads
//! configuration, wires a provider, and drives [`sqlgate_tool::SqlTool`]
//! from the command line.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlgate_config::{load_config, load_config_from_path, GatewayConfig, LlmConfig};
use sqlgate_core::{GatewayError, LlmProvider, SqlRequest};
use sqlgate_providers::{AnthropicProvider, MockProvider, OpenAiProvider, OpenRouterProvider};
use sqlgate_storage::{Database, QueryHistory};
use sqlgate_tool::SqlTool;
use tracing::error;

/// Sqlgate - a safe LLM-to-SQL gateway.
#[derive(Parser, Debug)]
#[command(name = "sqlgate", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the standard lookup hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one query (raw SQL or natural language) through the gateway.
    Ask {
        /// The question to answer.
        query: String,
        /// Principal identifier for rate limiting and audit.
        #[arg(long)]
        user: Option<String>,
        /// Skip the cache and history read path.
        #[arg(long)]
        bypass_cache: bool,
    },
    /// Delete expired query-history entries.
    Cleanup,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Commands::Ask {
            query,
            user,
            bypass_cache,
        } => ask(&config, query, user, bypass_cache).await,
        Commands::Cleanup => cleanup(&config).await.map(|_| true),
        Commands::Config => print_config(&config).map(|_| true),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        // The structured error envelope was already printed.
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(path: Option<&std::path::Path>) -> Result<GatewayConfig, GatewayError> {
    let loaded = match path {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    loaded.map_err(|e| GatewayError::Config(e.to_string()))
}

async fn ask(
    config: &GatewayConfig,
    query: String,
    user: Option<String>,
    bypass_cache: bool,
) -> Result<bool, GatewayError> {
    let provider = build_provider(&config.llm)?;
    let db = Database::open(&config.storage.database_path).await?;
    let tool = SqlTool::from_config(config, db, provider).await?;

    let request = SqlRequest {
        query,
        user_id: user,
        correlation_id: None,
        bypass_cache,
    };

    match tool.run(request).await {
        Ok(response) => {
            println!("{}", render_json(&response));
            Ok(true)
        }
        Err(envelope) => {
            println!("{}", render_json(&envelope));
            Ok(false)
        }
    }
}

async fn cleanup(config: &GatewayConfig) -> Result<(), GatewayError> {
    let db = Database::open(&config.storage.database_path).await?;
    let history = QueryHistory::new(db.clone(), config.history.retention_days);
    let deleted = history.cleanup().await?;
    println!("deleted {deleted} expired history entries");
    db.close().await
}

fn print_config(config: &GatewayConfig) -> Result<(), GatewayError> {
    println!("{}", render_json(config));
    Ok(())
}

fn render_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"render_error\": \"{e}\"}}"))
}

/// Instantiate the configured LLM provider.
fn build_provider(llm: &LlmConfig) -> Result<Arc<dyn LlmProvider>, GatewayError> {
    let api_key = || {
        llm.api_key.clone().ok_or_else(|| {
            GatewayError::Config(format!("llm.api_key is required for provider '{}'", llm.provider))
        })
    };

    match llm.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new())),
        "openrouter" => Ok(Arc::new(OpenRouterProvider::new(&api_key()?, &llm.model)?)),
        "anthropic" => Ok(Arc::new(AnthropicProvider::new(
            &api_key()?,
            &llm.model,
            llm.max_tokens,
        )?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(&api_key()?, &llm.model)?)),
        other => Err(GatewayError::Config(format!(
            "unknown llm.provider '{other}' (expected openrouter, anthropic, openai, or mock)"
        ))),
    }
}
