//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Compile the route table once, at construction
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve HTTP/1.1 and HTTP/2 connections from a TCP listener
//! - Dispatch requests to route handlers (404 / 405 when none fits)
//! - Graceful shutdown with a bounded grace period, then force-close
//!
//! # Design Decisions
//! - The request's operation deadline starts at dispatch and decides the
//!   timeout outcome (503); `TimeoutLayer` only backs it up
//! - A panicking handler becomes a 500, not a dropped connection

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use std::any::Any;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tower::Service;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, ServerConfig};
use crate::container::{ComponentKey, ContainerError, Injectable, Resolver};
use crate::http::handlers::{self, Handler, HealthHandler, UserHandler};
use crate::http::request::{RequestContext, X_REQUEST_ID};
use crate::http::response::ApiError;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::{metrics, Logger};
use crate::repository::OperationContext;
use crate::routing::{Route, RouteError, RouteMatch, RouteTable};

/// Metrics label for requests that matched no route.
const UNMATCHED: &str = "unmatched";

/// Extra time the outer timeout layer allows past the operation deadline.
const TIMEOUT_BACKSTOP: Duration = Duration::from_secs(1);

/// How [`HttpServer::start`] ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerExit {
    /// `shutdown` was called and open connections drained.
    Shutdown,
}

/// Listener failure while starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("listener failed: {0}")]
    Accept(#[source] io::Error),
}

impl From<ListenerError> for ServerError {
    fn from(err: ListenerError) -> Self {
        match err {
            ListenerError::Bind { address, source } => ServerError::Bind { address, source },
            ListenerError::Accept(source) => ServerError::Accept(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownError {
    /// The grace period ended first; `open` connections were force-closed.
    #[error("shutdown grace period exceeded, force-closed {open} connection(s)")]
    DeadlineExceeded { open: usize },
}

#[derive(Clone)]
struct DispatchState {
    routes: Arc<RouteTable<Handler>>,
    timeout: Duration,
}

/// HTTP server for the user API.
pub struct HttpServer {
    config: ServerConfig,
    app: Router,
    route_count: usize,
    builder: auto::Builder<TokioExecutor>,
    /// Stop accepting; ask connections to finish in-flight requests.
    graceful: CancellationToken,
    /// Drop whatever is still open.
    force: CancellationToken,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Build the server from its configuration and routes.
    pub fn configure(config: &ServerConfig, routes: Vec<Route<Handler>>) -> Result<Self, RouteError> {
        let table = Arc::new(RouteTable::new(routes)?);
        let route_count = table.len();
        let app = Self::build_router(config, table);

        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(config.read_timeout());

        Ok(Self {
            config: config.clone(),
            app,
            route_count,
            builder,
            graceful: CancellationToken::new(),
            force: CancellationToken::new(),
            tracker: ConnectionTracker::new(),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, routes: Arc<RouteTable<Handler>>) -> Router {
        let state = DispatchState {
            routes,
            timeout: config.write_timeout(),
        };

        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.max_body_size))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::SERVICE_UNAVAILABLE,
                config.write_timeout().saturating_add(TIMEOUT_BACKSTOP),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Bind `server.host:server.port` and serve until shut down.
    pub async fn start(&self) -> Result<ServerExit, ServerError> {
        let listener = Listener::bind(&self.config.address()).await?;
        self.serve(listener).await
    }

    /// Serve an already-bound listener until shut down.
    pub async fn start_with_listener(&self, listener: TcpListener) -> Result<ServerExit, ServerError> {
        self.serve(Listener::from_tokio(listener)).await
    }

    async fn serve(&self, listener: Listener) -> Result<ServerExit, ServerError> {
        let addr = listener.local_addr().map_err(ServerError::Accept)?;
        tracing::info!(address = %addr, routes = self.route_count, "HTTP server starting");

        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.graceful.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => self.spawn_connection(stream, peer),
                Err(e) => {
                    tracing::error!(error = %e, "Listener failed");
                    self.graceful.cancel();
                    return Err(e.into());
                }
            }
        }

        drop(listener);
        tracing::info!(open = self.tracker.open(), "Stopped accepting connections");
        self.tracker.idle().await;
        tracing::info!("HTTP server stopped");
        Ok(ServerExit::Shutdown)
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let guard = self.tracker.track();
        let app = self.app.clone();
        let builder = self.builder.clone();
        let graceful = self.graceful.clone();
        let force = self.force.clone();

        tokio::spawn(async move {
            let id = guard.id();
            let service = service_fn(move |request: Request<Incoming>| app.clone().call(request));
            let conn = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let mut draining = false;
            loop {
                tokio::select! {
                    result = conn.as_mut() => {
                        if let Err(e) = result {
                            tracing::debug!(connection_id = %id, peer_addr = %peer, error = %e, "Connection error");
                        }
                        break;
                    }
                    _ = graceful.cancelled(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                    _ = force.cancelled(), if draining => {
                        tracing::warn!(connection_id = %id, peer_addr = %peer, "Connection force-closed");
                        break;
                    }
                }
            }
            drop(guard);
        });
    }

    /// Stop accepting, let in-flight requests finish for up to `grace`, then
    /// force-close what is left.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), ShutdownError> {
        tracing::info!(
            grace_secs = grace.as_secs_f64(),
            open = self.tracker.open(),
            "Graceful shutdown started"
        );
        self.graceful.cancel();

        match tokio::time::timeout(grace, self.tracker.idle()).await {
            Ok(()) => {
                tracing::info!("All connections drained");
                Ok(())
            }
            Err(_) => {
                let open = self.tracker.open();
                tracing::warn!(open, "Shutdown grace period exceeded");
                self.force.cancel();
                Err(ShutdownError::DeadlineExceeded { open })
            }
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }

    /// Connections currently open.
    pub fn open_connections(&self) -> usize {
        self.tracker.open()
    }
}

impl Injectable for HttpServer {
    fn dependencies() -> Vec<ComponentKey> {
        vec![
            ComponentKey::of::<AppConfig>(),
            ComponentKey::of::<Logger>(),
            ComponentKey::of::<UserHandler>(),
            ComponentKey::of::<HealthHandler>(),
        ]
    }

    fn inject(resolver: &Resolver<'_>) -> Result<Self, ContainerError> {
        let config = resolver.resolve::<AppConfig>()?;
        let logger = resolver.resolve::<Logger>()?;
        let users = resolver.resolve::<UserHandler>()?;
        let health = resolver.resolve::<HealthHandler>()?;

        let routes = handlers::routes(&users, &health).map_err(|e| resolver.construction_error(e))?;
        let server =
            Self::configure(&config.server, routes).map_err(|e| resolver.construction_error(e))?;

        tracing::debug!(
            app = logger.app(),
            address = %config.server.address(),
            routes = server.route_count(),
            "HTTP server configured"
        );
        Ok(server)
    }
}

/// Route lookup and handler invocation.
async fn dispatch(State(state): State<DispatchState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let operation = OperationContext::with_timeout(state.timeout);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (route, params) = match state.routes.lookup(&method, &path) {
        RouteMatch::Found { route, params } => (route, params),
        RouteMatch::MethodNotAllowed { allow } => {
            metrics::record_request(method.as_str(), UNMATCHED, 405, start);
            return ApiError::MethodNotAllowed(allow).into_response();
        }
        RouteMatch::NotFound => {
            tracing::debug!(method = %method, path = %path, "No route matched");
            metrics::record_request(method.as_str(), UNMATCHED, 404, start);
            return ApiError::NotFound("Not found").into_response();
        }
    };

    let response = match RequestContext::from_request(request, params, operation).await {
        Ok(request) => (route.handler)(request).await,
        Err(err) => err.into_response(),
    };

    metrics::record_request(
        method.as_str(),
        route.pattern.as_str(),
        response.status().as_u16(),
        start,
    );
    response
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = detail, "Handler panicked");
    ApiError::Internal("Internal server error").into_response()
}
