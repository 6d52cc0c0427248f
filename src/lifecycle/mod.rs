//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Register components → Validate graph → Resolve server
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core components, then listener
//! - Ordered shutdown: stop accept, drain, force-close
//! - Shutdown has timeout: force-close after `server.shutdown_timeout`

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{serve_until, LifecycleError};
pub use signals::shutdown_signal;
pub use startup::{build_container, register_services};
