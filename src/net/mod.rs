//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, transient error filtering)
//!     → connection.rs (lifecycle tracking)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Active → Draining (graceful shutdown sent) → Closed
//! ```
//!
//! # Design Decisions
//! - Each connection tracked for graceful shutdown
//! - Per-connection accept errors never stop the listener

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
