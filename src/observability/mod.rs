//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, app-scoped spans)
//!     → metrics.rs (request counters and latency histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout/stderr, console or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the HTTP trace span
//! - Metrics are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::{Logger, LoggingError};
