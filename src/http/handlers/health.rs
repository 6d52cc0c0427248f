//! Liveness endpoint.

use axum::Json;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::container::{ComponentKey, ContainerError, Injectable, Resolver};
use crate::http::dto::HealthResponse;
use crate::http::request::RequestContext;
use crate::observability::Logger;

pub struct HealthHandler {
    logger: Arc<Logger>,
    service: String,
}

impl HealthHandler {
    pub fn new(logger: Arc<Logger>, service: impl Into<String>) -> Self {
        Self {
            logger,
            service: service.into(),
        }
    }

    /// `GET /health`
    pub async fn check(self: Arc<Self>, _request: RequestContext) -> Json<HealthResponse> {
        self.logger
            .operation("health_check")
            .in_scope(|| tracing::trace!("Health check"));

        Json(HealthResponse {
            status: "healthy".to_string(),
            service: self.service.clone(),
        })
    }
}

impl Injectable for HealthHandler {
    fn dependencies() -> Vec<ComponentKey> {
        vec![ComponentKey::of::<AppConfig>(), ComponentKey::of::<Logger>()]
    }

    fn inject(resolver: &Resolver<'_>) -> Result<Self, ContainerError> {
        let config = resolver.resolve::<AppConfig>()?;
        let logger = resolver.resolve::<Logger>()?;
        Ok(Self::new(logger, config.app.name.clone()))
    }
}
