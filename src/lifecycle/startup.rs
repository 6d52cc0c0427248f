//! Startup orchestration.
//!
//! # Responsibilities
//! - Register every component with the container
//! - Validate the dependency graph before anything is built
//!
//! # Design Decisions
//! - Fail fast: any container error is fatal
//! - Nothing is constructed here; resolution happens on first use

use std::sync::Arc;

use crate::config::AppConfig;
use crate::container::{Container, ContainerError};
use crate::http::{HealthHandler, HttpServer, UserHandler};
use crate::observability::Logger;
use crate::repository;

/// Register the components that sit above configuration and storage.
pub fn register_services(container: &Container) -> Result<(), ContainerError> {
    container.register_injectable::<Logger>()?;
    container.register_injectable::<UserHandler>()?;
    container.register_injectable::<HealthHandler>()?;
    container.register_injectable::<HttpServer>()?;
    Ok(())
}

/// A validated container holding the whole service graph.
pub fn build_container(config: AppConfig) -> Result<Container, ContainerError> {
    let container = Container::new();
    container.register_value(Arc::new(config))?;
    repository::register(&container)?;
    register_services(&container)?;
    container.validate()?;

    tracing::debug!(
        components = container.registered().len(),
        "Container ready"
    );
    Ok(container)
}
