//! Graceful and forced shutdown with requests in flight.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use user_api::container::{Container, ContainerError};
use user_api::domain::{NewUser, User};
use user_api::http::{ServerExit, ShutdownError};
use user_api::repository::{
    InMemoryUserRepository, OperationContext, RepositoryResult, UserRepository,
};

mod common;
use common::TestServer;

/// In-memory repository whose listing takes `delay`.
struct SlowRepository {
    inner: InMemoryUserRepository,
    delay: Duration,
}

#[async_trait]
impl UserRepository for SlowRepository {
    fn backend(&self) -> &'static str {
        "slow"
    }

    async fn create_user(&self, ctx: &OperationContext, user: NewUser) -> RepositoryResult<User> {
        self.inner.create_user(ctx, user).await
    }

    async fn get_user_by_id(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<User> {
        self.inner.get_user_by_id(ctx, id).await
    }

    async fn list_users(
        &self,
        ctx: &OperationContext,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<User>> {
        ctx.run(async {
            tokio::time::sleep(self.delay).await;
            Ok(())
        })
        .await?;
        self.inner.list_users(ctx, limit, offset).await
    }

    async fn update_user(
        &self,
        ctx: &OperationContext,
        id: i64,
        changes: NewUser,
    ) -> RepositoryResult<User> {
        self.inner.update_user(ctx, id, changes).await
    }

    async fn delete_user(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<()> {
        self.inner.delete_user(ctx, id).await
    }
}

fn register_slow(delay: Duration) -> impl FnOnce(&Container) -> Result<(), ContainerError> {
    move |container: &Container| {
        container.register::<dyn UserRepository, _>(move |_| {
            Ok(Arc::new(SlowRepository {
                inner: InMemoryUserRepository::new(),
                delay,
            }) as Arc<dyn UserRepository>)
        })
    }
}

async fn slow_server(delay: Duration) -> TestServer {
    TestServer::start_with(register_slow(delay)).await
}

#[tokio::test]
async fn test_in_flight_request_completes_within_grace() {
    let server = slow_server(Duration::from_millis(300)).await;

    let request = tokio::spawn(server.client.get(server.url("/api/v1/users")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.server.open_connections(), 1);

    let (drained, exit) = server.stop(Duration::from_secs(5)).await;
    assert!(drained.is_ok(), "{drained:?}");
    assert!(matches!(exit, Ok(ServerExit::Shutdown)));

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_grace_expiry_force_closes_connections() {
    let server = slow_server(Duration::from_secs(30)).await;

    let request = tokio::spawn(server.client.get(server.url("/api/v1/users")).send());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (drained, exit) = server.stop(Duration::from_millis(200)).await;
    assert!(
        matches!(drained, Err(ShutdownError::DeadlineExceeded { open }) if open >= 1),
        "{drained:?}"
    );
    assert!(exit.is_ok());

    // The connection is dropped without a response.
    let outcome = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_err());
}

#[tokio::test]
async fn test_no_new_connections_after_shutdown() {
    let server = TestServer::start().await;
    let addr = server.addr;

    let (drained, _) = server.stop(Duration::from_secs(1)).await;
    assert!(drained.is_ok());
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_repository_deadline_is_503_without_body() {
    let mut config = TestServer::config();
    config.server.write_timeout = 1;
    let server =
        TestServer::start_configured(config, register_slow(Duration::from_secs(10))).await;

    let started = Instant::now();
    let response = server
        .client
        .get(server.url("/api/v1/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(response.bytes().await.unwrap().is_empty());

    let (drained, _) = server.stop(Duration::from_secs(2)).await;
    assert!(drained.is_ok());
}
