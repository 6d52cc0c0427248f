//! Error-to-response mapping.
//!
//! # Responsibilities
//! - Map handler failures to HTTP status codes
//! - Render `{"error": "<message>"}` bodies
//!
//! # Design Decisions
//! - Internal failures carry a fixed client-facing phrase; the detail is
//!   logged by the handler before mapping
//! - Cancelled requests get 503 with an empty body (the client is gone)
//! - 405 responses list the allowed methods in `Allow`

use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::http::dto::ErrorResponse;

/// Failures a handler returns instead of a success body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed id, query or body; message names the problem.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Method not allowed")]
    MethodNotAllowed(Vec<Method>),

    /// The request body could not be read (too large, aborted).
    #[error("{message}")]
    Body { status: StatusCode, message: String },

    /// Repository or other server-side failure.
    #[error("{0}")]
    Internal(&'static str),

    /// The request's operation context ended first.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Body { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        match self {
            ApiError::Cancelled => status.into_response(),
            ApiError::MethodNotAllowed(allow) => {
                let allow = allow
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                (status, [(header::ALLOW, allow)], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
