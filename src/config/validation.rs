//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, connection pool bounds)
//! - Reject unknown enumerated values (log level, format, output, driver)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::AppConfig;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const FORMATS: &[&str] = &["console", "json"];
const OUTPUTS: &[&str] = &["stdout", "stderr"];
const DRIVERS: &[&str] = &["memory", "postgres"];

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub key: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

fn one_of(
    errors: &mut Vec<ValidationError>,
    key: &'static str,
    value: &str,
    allowed: &[&str],
) {
    if !allowed.contains(&value) {
        errors.push(ValidationError::new(
            key,
            format!("`{}` is not one of {}", value, allowed.join(", ")),
        ));
    }
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "must not be empty"));
    }
    for (key, secs) in [
        ("server.read_timeout", config.server.read_timeout),
        ("server.write_timeout", config.server.write_timeout),
    ] {
        if secs == 0 {
            errors.push(ValidationError::new(key, "must be greater than 0"));
        }
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::new(
            "server.max_body_size",
            "must be greater than 0",
        ));
    }

    one_of(&mut errors, "database.driver", &config.database.driver, DRIVERS);
    if config.database.max_open_conns == 0 {
        errors.push(ValidationError::new(
            "database.max_open_conns",
            "must be greater than 0",
        ));
    }
    if config.database.max_idle_conns > config.database.max_open_conns {
        errors.push(ValidationError::new(
            "database.max_idle_conns",
            "must not exceed database.max_open_conns",
        ));
    }

    one_of(&mut errors, "logger.level", &config.logger.level, LEVELS);
    one_of(&mut errors, "logger.format", &config.logger.format, FORMATS);
    one_of(&mut errors, "logger.output", &config.logger.output, OUTPUTS);

    if config.app.name.trim().is_empty() {
        errors.push(ValidationError::new("app.name", "must not be empty"));
    }
    if config.metrics.enabled && config.metrics.address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "metrics.address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
