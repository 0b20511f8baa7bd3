/// Configuration management for feed-service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

/// Tuning for the background fan-out pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Upper bound for a single follower or tag lookup
    #[serde(default = "default_resolver_timeout_ms")]
    pub resolver_timeout_ms: u64,
    /// Upper bound for the batch insert of feed entries
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Pending fan-out jobs before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Fan-out jobs executing at the same time
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Tag subscriber lookups in flight per fan-out
    #[serde(default = "default_tag_lookup_concurrency")]
    pub tag_lookup_concurrency: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            resolver_timeout_ms: default_resolver_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            queue_capacity: default_queue_capacity(),
            max_concurrency: default_max_concurrency(),
            tag_lookup_concurrency: default_tag_lookup_concurrency(),
        }
    }
}

impl FanoutConfig {
    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_resolver_timeout_ms() -> u64 {
    3_000
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_queue_capacity() -> usize {
    1_024
}

fn default_max_concurrency() -> usize {
    8
}

fn default_tag_lookup_concurrency() -> usize {
    2
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("APP_PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .context("APP_PORT must be a valid port number")?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", default_max_connections()),
            min_connections: env_or("DB_MIN_CONNECTIONS", default_min_connections()),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", default_acquire_timeout_secs()),
        };

        let fanout = FanoutConfig {
            resolver_timeout_ms: env_or(
                "FANOUT_RESOLVER_TIMEOUT_MS",
                default_resolver_timeout_ms(),
            ),
            write_timeout_ms: env_or("FANOUT_WRITE_TIMEOUT_MS", default_write_timeout_ms()),
            queue_capacity: env_or("FANOUT_QUEUE_CAPACITY", default_queue_capacity()).max(1),
            max_concurrency: env_or("FANOUT_MAX_CONCURRENCY", default_max_concurrency()).max(1),
            tag_lookup_concurrency: env_or(
                "FANOUT_TAG_LOOKUP_CONCURRENCY",
                default_tag_lookup_concurrency(),
            )
            .max(1),
        };

        Ok(Config {
            app,
            database,
            fanout,
        })
    }
}
