//! User API service library.

// Core subsystems
pub mod config;
pub mod container;
pub mod domain;
pub mod http;
pub mod net;
pub mod repository;
pub mod routing;

// Cross-cutting concerns
pub mod cli;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use container::{Container, ContainerError, Injectable};
pub use http::HttpServer;
pub use lifecycle::build_container;
