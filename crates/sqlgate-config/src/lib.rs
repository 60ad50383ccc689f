// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the sqlgate gateway.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    BreakerConfig, CacheConfig, GatewayConfig, HistoryConfig, LlmConfig, RateLimitConfig,
    StorageConfig, ValidatorConfig,
};
