//! Configuration loading.
//!
//! Layers, lowest precedence first: built-in defaults, optional TOML file,
//! environment variables, command-line flags. Environment variables and
//! flags address the same dotted keys (`server.port` ↔ `SERVER_PORT`).

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Every overridable key.
pub const KEYS: &[&str] = &[
    "server.host",
    "server.port",
    "server.read_timeout",
    "server.write_timeout",
    "server.shutdown_timeout",
    "server.max_body_size",
    "database.driver",
    "database.host",
    "database.port",
    "database.user",
    "database.password",
    "database.database",
    "database.ssl_mode",
    "database.max_open_conns",
    "database.max_idle_conns",
    "database.conn_max_lifetime",
    "logger.level",
    "logger.format",
    "logger.output",
    "logger.no_color",
    "app.name",
    "app.version",
    "app.environment",
    "app.debug",
    "metrics.enabled",
    "metrics.address",
];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown configuration key `{0}`")]
    UnknownKey(String),

    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variable consulted for a dotted key.
pub fn env_var_name(key: &str) -> String {
    key.replace('.', "_").to_uppercase()
}

impl AppConfig {
    /// Apply a single dotted-key override.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "server.host" => self.server.host = value.to_string(),
            "server.port" => self.server.port = parse(key, value)?,
            "server.read_timeout" => self.server.read_timeout = parse(key, value)?,
            "server.write_timeout" => self.server.write_timeout = parse(key, value)?,
            "server.shutdown_timeout" => self.server.shutdown_timeout = parse(key, value)?,
            "server.max_body_size" => self.server.max_body_size = parse(key, value)?,
            "database.driver" => self.database.driver = value.to_string(),
            "database.host" => self.database.host = value.to_string(),
            "database.port" => self.database.port = parse(key, value)?,
            "database.user" => self.database.user = value.to_string(),
            "database.password" => self.database.password = value.to_string(),
            "database.database" => self.database.database = value.to_string(),
            "database.ssl_mode" => self.database.ssl_mode = value.to_string(),
            "database.max_open_conns" => self.database.max_open_conns = parse(key, value)?,
            "database.max_idle_conns" => self.database.max_idle_conns = parse(key, value)?,
            "database.conn_max_lifetime" => {
                self.database.conn_max_lifetime = parse(key, value)?
            }
            "logger.level" => self.logger.level = value.to_string(),
            "logger.format" => self.logger.format = value.to_string(),
            "logger.output" => self.logger.output = value.to_string(),
            "logger.no_color" => self.logger.no_color = parse_bool(key, value)?,
            "app.name" => self.app.name = value.to_string(),
            "app.version" => self.app.version = value.to_string(),
            "app.environment" => self.app.environment = value.to_string(),
            "app.debug" => self.app.debug = parse_bool(key, value)?,
            "metrics.enabled" => self.metrics.enabled = parse_bool(key, value)?,
            "metrics.address" => self.metrics.address = value.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Log level after applying `app.debug`.
    pub fn log_level(&self) -> &str {
        if self.app.debug && self.logger.level != "trace" {
            "debug"
        } else {
            &self.logger.level
        }
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Builds an [`AppConfig`] from its layers.
pub struct ConfigLoader<'a> {
    file: Option<&'a Path>,
    env: Box<dyn Fn(&str) -> Option<String> + 'a>,
    overrides: Vec<(String, String)>,
}

impl<'a> ConfigLoader<'a> {
    /// Loader reading the process environment.
    pub fn new() -> Self {
        Self {
            file: None,
            env: Box::new(|name| std::env::var(name).ok()),
            overrides: Vec::new(),
        }
    }

    /// Read a TOML file on top of the defaults.
    pub fn file(mut self, path: &'a Path) -> Self {
        self.file = Some(path);
        self
    }

    /// Replace the environment lookup.
    pub fn env_source(mut self, source: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.env = Box::new(source);
        self
    }

    /// Add a flag-level override.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Merge all layers and validate the result.
    pub fn load(self) -> Result<AppConfig, ConfigError> {
        let mut config = match self.file {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => AppConfig::default(),
        };

        for key in KEYS {
            if let Some(value) = (self.env)(&env_var_name(key)) {
                config.set(key, &value)?;
            }
        }

        for (key, value) in &self.overrides {
            config.set(key, value)?;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

impl Default for ConfigLoader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    ConfigLoader::new().file(path).load()
}
