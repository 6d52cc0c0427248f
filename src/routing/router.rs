//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the route for a method and path
//! - Distinguish "no such path" from "path exists, wrong method"
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over routes (acceptable for typical route counts)
//! - Literal segments beat parameters: `/users/me` wins over `/users/:id`
//! - Explicit NotFound / MethodNotAllowed rather than a silent default

use axum::http::Method;
use thiserror::Error;

use crate::routing::matcher::{PathParams, PathPattern};

/// Errors raised while building a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route {method} {pattern} registered twice")]
    Duplicate { method: Method, pattern: String },
}

/// A method + path pattern bound to a handler.
#[derive(Debug, Clone)]
pub struct Route<H> {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: H,
}

impl<H> Route<H> {
    pub fn new(method: Method, pattern: &str, handler: H) -> Result<Self, RouteError> {
        Ok(Self {
            method,
            pattern: PathPattern::parse(pattern)?,
            handler,
        })
    }
}

/// Outcome of a lookup.
#[derive(Debug)]
pub enum RouteMatch<'a, H> {
    Found {
        route: &'a Route<H>,
        params: PathParams,
    },
    /// The path exists under other methods, listed for the `Allow` header.
    MethodNotAllowed { allow: Vec<Method> },
    NotFound,
}

/// Immutable table of routes, generic over the handler type.
#[derive(Debug)]
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
}

impl<H> RouteTable<H> {
    /// Compile the table, rejecting duplicate method + pattern pairs.
    pub fn new(mut routes: Vec<Route<H>>) -> Result<Self, RouteError> {
        for (i, route) in routes.iter().enumerate() {
            if routes[..i]
                .iter()
                .any(|r| r.method == route.method && r.pattern == route.pattern)
            {
                return Err(RouteError::Duplicate {
                    method: route.method.clone(),
                    pattern: route.pattern.to_string(),
                });
            }
        }

        // Stable: registration order breaks ties
        routes.sort_by_key(|r| r.pattern.param_count());

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Ok(Self { routes })
    }

    pub fn lookup(&self, method: &Method, path: &str) -> RouteMatch<'_, H> {
        let mut allow = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            if route.method == *method {
                return RouteMatch::Found { route, params };
            }
            if !allow.contains(&route.method) {
                allow.push(route.method.clone());
            }
        }

        if allow.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed { allow }
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
