//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment-wise pattern match, bind `:name` params)
//!     → Return: Found(route, params) | MethodNotAllowed(allow) | NotFound
//!
//! Route Compilation (at server construction):
//!     Route[] { method, "/api/v1/users/:id", handler }
//!     → Parse patterns into segments
//!     → Reject duplicates
//!     → Sort literal-first (fewer params wins)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - `:name` binds exactly one non-empty segment; no catch-alls

pub mod matcher;
pub mod router;

pub use matcher::{PathParams, PathPattern};
pub use router::{Route, RouteError, RouteMatch, RouteTable};
