//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener and request lifecycle settings.
    pub server: ServerConfig,

    /// Storage backend selection and connection settings.
    pub database: DatabaseConfig,

    /// Log output settings.
    pub logger: LoggerConfig,

    /// Application identity.
    pub app: AppInfoConfig,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP to bind.
    pub host: String,

    /// TCP port to bind (0 picks an ephemeral port).
    pub port: u16,

    /// Time allowed to read a request, in seconds.
    pub read_timeout: u64,

    /// Time allowed to produce a response, in seconds.
    pub write_timeout: u64,

    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_timeout: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl ServerConfig {
    /// `host:port` as accepted by `TcpListener::bind`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            read_timeout: 30,
            write_timeout: 30,
            shutdown_timeout: 10,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backend implementation: `memory` or `postgres`.
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// PostgreSQL `sslmode` (disable, prefer, require, ...).
    pub ssl_mode: String,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    /// Connection max lifetime in seconds.
    pub conn_max_lifetime: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: "memory".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "user_api".to_string(),
            ssl_mode: "disable".to_string(),
            max_open_conns: 25,
            max_idle_conns: 25,
            conn_max_lifetime: 300,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// `console` for human-readable lines, `json` for structured output.
    pub format: String,

    /// `stdout` or `stderr`.
    pub output: String,

    /// Disable ANSI colors.
    pub no_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "console".to_string(),
            output: "stdout".to_string(),
            no_color: false,
        }
    }
}

/// Application identity.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppInfoConfig {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub debug: bool,
}

impl Default for AppInfoConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            debug: false,
        }
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose a Prometheus scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:9090".to_string(),
        }
    }
}
