//! Per-request context handed to handlers.
//!
//! # Responsibilities
//! - Buffer the request body (bounded by the body-limit layer)
//! - Expose path params, query params and the request ID
//! - Own the request's [`OperationContext`] (deadline taken when the request
//!   was dispatched, cancelled if the request is abandoned)
//!
//! # Design Decisions
//! - Request ID assigned by middleware as early as possible for tracing
//! - Body limit enforced by `DefaultBodyLimit` while buffering

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Query};
use axum::http::{HeaderMap, Method, Request, Uri};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio_util::sync::DropGuard;

use crate::http::response::ApiError;
use crate::repository::OperationContext;
use crate::routing::PathParams;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Everything a handler needs from one request.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: PathParams,
    body: Bytes,
    operation: OperationContext,
    _cancel_on_drop: DropGuard,
}

impl RequestContext {
    /// Buffer `request` and attach the matched route params.
    ///
    /// `operation` bounds everything after this point, so its deadline
    /// should already be running while the body is read.
    pub async fn from_request(
        request: Request<Body>,
        params: PathParams,
        operation: OperationContext,
    ) -> Result<Self, ApiError> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let headers = request.headers().clone();

        let body = Bytes::from_request(request, &())
            .await
            .map_err(|rejection| ApiError::Body {
                status: rejection.status(),
                message: rejection.body_text(),
            })?;

        let cancel_on_drop = operation.cancel_on_drop();

        Ok(Self {
            method,
            uri,
            headers,
            params,
            body,
            operation,
            _cancel_on_drop: cancel_on_drop,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Single query parameter; `None` when absent or the query is malformed.
    pub fn query(&self, name: &str) -> Option<String> {
        Query::<HashMap<String, String>>::try_from_uri(&self.uri)
            .ok()
            .and_then(|Query(mut query)| query.remove(name))
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    /// Context to pass to repository calls.
    pub fn operation(&self) -> &OperationContext {
        &self.operation
    }
}
