//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, middleware, dispatch)
//!     → routing (method + path → route, params)
//!     → request.rs (buffer body, params, operation context)
//!     → handlers/ (validate → repository → DTO)
//!     → response.rs (ApiError → status + {"error": ...})
//!     → Send to client
//! ```

pub mod dto;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use handlers::{Handler, HealthHandler, UserHandler};
pub use request::{RequestContext, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{HttpServer, ServerError, ServerExit, ShutdownError};
