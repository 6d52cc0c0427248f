//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency by method, route
//!
//! # Design Decisions
//! - Labels use the route pattern (`/api/v1/users/:id`), never the raw
//!   path, to keep cardinality bounded
//! - Histogram buckets tuned for typical web latencies

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;
use thiserror::Error;

use crate::config::MetricsConfig;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics address `{0}`")]
    Address(String),

    #[error("failed to start Prometheus exporter: {0}")]
    Exporter(#[from] BuildError),
}

/// Install the global recorder and serve `/metrics` on `config.address`.
pub fn init_exporter(config: &MetricsConfig) -> Result<(), MetricsError> {
    let addr: SocketAddr = config
        .address
        .parse()
        .map_err(|_| MetricsError::Address(config.address.clone()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
        .install()?;

    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Record one completed request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        REQUEST_DURATION,
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
