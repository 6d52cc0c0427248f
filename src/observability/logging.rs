//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber from configuration
//! - Provide the container-managed [`Logger`] component
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - JSON format for production, console format for development
//! - `app.debug` lowers the default level to `debug`

use thiserror::Error;
use tracing::Span;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{filter::ParseError, fmt, EnvFilter, Layer};

use crate::config::AppConfig;
use crate::container::{ComponentKey, ContainerError, Injectable, Resolver};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("logging already initialized: {0}")]
    Init(#[from] TryInitError),
}

/// Install the global subscriber.
pub fn init(config: &AppConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_level())?,
    };

    let logger = &config.logger;
    let writer = match logger.output.as_str() {
        "stderr" => BoxMakeWriter::new(std::io::stderr),
        _ => BoxMakeWriter::new(std::io::stdout),
    };

    let layer = match logger.format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_current_span(true)
            .boxed(),
        _ => fmt::layer()
            .with_writer(writer)
            .with_ansi(!logger.no_color)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;

    tracing::debug!(
        level = config.log_level(),
        format = %logger.format,
        output = %logger.output,
        "Logging initialized"
    );
    Ok(())
}

/// Application-scoped logger handed to components by the container.
///
/// Holds the application span (`name`, `environment`, `version`); operation
/// spans are its children, so every event inside one carries the service
/// identity.
#[derive(Debug, Clone)]
pub struct Logger {
    app: String,
    span: Span,
}

impl Logger {
    pub fn new(config: &AppConfig) -> Self {
        let app = &config.app;
        Self {
            span: tracing::info_span!(
                "app",
                name = %app.name,
                environment = %app.environment,
                version = %app.version
            ),
            app: app.name.clone(),
        }
    }

    /// Span for one unit of work, a child of the application span.
    pub fn operation(&self, operation: &'static str) -> Span {
        tracing::info_span!(parent: &self.span, "operation", operation)
    }

    pub fn app(&self) -> &str {
        &self.app
    }
}

impl Injectable for Logger {
    fn dependencies() -> Vec<ComponentKey> {
        vec![ComponentKey::of::<AppConfig>()]
    }

    fn inject(resolver: &Resolver<'_>) -> Result<Self, ContainerError> {
        let config = resolver.resolve::<AppConfig>()?;
        Ok(Self::new(&config))
    }
}
