//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use user_api::config::{AppConfig, ServerConfig};
use user_api::container::{Container, ContainerError};
use user_api::http::{HttpServer, ServerError, ServerExit, ShutdownError};
use user_api::lifecycle::register_services;
use user_api::repository;

/// A container-built server listening on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub server: Arc<HttpServer>,
    pub container: Container,
    pub client: reqwest::Client,
    running: JoinHandle<Result<ServerExit, ServerError>>,
}

impl TestServer {
    /// Server backed by the configured (in-memory) repository.
    pub async fn start() -> Self {
        Self::start_with(repository::register).await
    }

    /// Server whose `dyn UserRepository` is registered by `register_repository`.
    pub async fn start_with<F>(register_repository: F) -> Self
    where
        F: FnOnce(&Container) -> Result<(), ContainerError>,
    {
        Self::start_configured(Self::config(), register_repository).await
    }

    /// Loopback configuration used by [`TestServer::start`].
    pub fn config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                ..ServerConfig::default()
            },
            ..AppConfig::default()
        }
    }

    pub async fn start_configured<F>(config: AppConfig, register_repository: F) -> Self
    where
        F: FnOnce(&Container) -> Result<(), ContainerError>,
    {
        let container = Container::new();
        container.register_value(Arc::new(config)).unwrap();
        register_repository(&container).unwrap();
        register_services(&container).unwrap();
        container.validate().unwrap();

        let server = container.resolve::<HttpServer>().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let running = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.start_with_listener(listener).await }
        });

        Self {
            addr,
            server,
            container,
            client: reqwest::Client::new(),
            running,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Shut down with `grace` and wait for `start` to return.
    pub async fn stop(
        self,
        grace: Duration,
    ) -> (Result<(), ShutdownError>, Result<ServerExit, ServerError>) {
        let drained = self.server.shutdown(grace).await;
        let exit = tokio::time::timeout(Duration::from_secs(5), self.running)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        (drained, exit)
    }
}
