//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment variables  SERVER_PORT=9000
//!     → command-line flags     --server.port 9000
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → registered in the container, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Environment variables and flags override the same dotted keys
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    AppConfig, AppInfoConfig, DatabaseConfig, LoggerConfig, MetricsConfig, ServerConfig,
};
