//! User CRUD endpoints.
//!
//! # Responsibilities
//! - Parse and validate ids, query params and bodies before any storage call
//! - Call the repository with the request's operation context
//! - Map repository errors to responses, logging the detail
//!
//! # Design Decisions
//! - Clients see a fixed phrase per operation, never the storage error
//! - `limit`/`offset` fall back to defaults instead of rejecting the request

use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::Instrument;
use validator::Validate;

use crate::container::{ComponentKey, ContainerError, Injectable, Resolver};
use crate::domain::User;
use crate::http::dto::{
    validation_message, CreateUserRequest, ListUsersResponse, MessageResponse, UpdateUserRequest,
};
use crate::http::request::RequestContext;
use crate::http::response::ApiError;
use crate::observability::Logger;
use crate::repository::{RepositoryError, UserRepository};

pub const DEFAULT_LIMIT: i64 = 20;
pub const DEFAULT_OFFSET: i64 = 0;

pub struct UserHandler {
    repository: Arc<dyn UserRepository>,
    logger: Arc<Logger>,
}

impl UserHandler {
    pub fn new(repository: Arc<dyn UserRepository>, logger: Arc<Logger>) -> Self {
        Self { repository, logger }
    }

    /// `POST /api/v1/users`
    pub async fn create(
        self: Arc<Self>,
        request: RequestContext,
    ) -> Result<(StatusCode, Json<User>), ApiError> {
        let body: CreateUserRequest = request.json()?;
        body.validate()
            .map_err(|e| ApiError::BadRequest(validation_message(&e)))?;

        let user = self
            .repository
            .create_user(request.operation(), body.into())
            .instrument(self.logger.operation("create_user"))
            .await
            .map_err(|e| self.failure("create_user", "Failed to create user", e))?;

        tracing::info!(user_id = user.id, "User created");
        Ok((StatusCode::CREATED, Json(user)))
    }

    /// `GET /api/v1/users/:id`
    pub async fn get(self: Arc<Self>, request: RequestContext) -> Result<Json<User>, ApiError> {
        let id = user_id(&request)?;

        self.repository
            .get_user_by_id(request.operation(), id)
            .instrument(self.logger.operation("get_user"))
            .await
            .map(Json)
            .map_err(|e| self.failure("get_user", "Failed to get user", e))
    }

    /// `GET /api/v1/users?limit=&offset=`
    pub async fn list(
        self: Arc<Self>,
        request: RequestContext,
    ) -> Result<Json<ListUsersResponse>, ApiError> {
        let limit = query_i64(&request, "limit")
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_LIMIT);
        let offset = query_i64(&request, "offset")
            .filter(|offset| *offset >= 0)
            .unwrap_or(DEFAULT_OFFSET);

        let users = self
            .repository
            .list_users(request.operation(), limit, offset)
            .instrument(self.logger.operation("list_users"))
            .await
            .map_err(|e| self.failure("list_users", "Failed to list users", e))?;

        Ok(Json(ListUsersResponse {
            users,
            limit,
            offset,
        }))
    }

    /// `PUT /api/v1/users/:id`
    pub async fn update(self: Arc<Self>, request: RequestContext) -> Result<Json<User>, ApiError> {
        let id = user_id(&request)?;
        let body: UpdateUserRequest = request.json()?;
        body.validate()
            .map_err(|e| ApiError::BadRequest(validation_message(&e)))?;

        let user = self
            .repository
            .update_user(request.operation(), id, body.into())
            .instrument(self.logger.operation("update_user"))
            .await
            .map_err(|e| self.failure("update_user", "Failed to update user", e))?;

        tracing::info!(user_id = user.id, "User updated");
        Ok(Json(user))
    }

    /// `DELETE /api/v1/users/:id`
    pub async fn delete(
        self: Arc<Self>,
        request: RequestContext,
    ) -> Result<Json<MessageResponse>, ApiError> {
        let id = user_id(&request)?;

        self.repository
            .delete_user(request.operation(), id)
            .instrument(self.logger.operation("delete_user"))
            .await
            .map_err(|e| self.failure("delete_user", "Failed to delete user", e))?;

        tracing::info!(user_id = id, "User deleted");
        Ok(Json(MessageResponse {
            message: "User deleted successfully".to_string(),
        }))
    }

    fn failure(&self, operation: &'static str, phrase: &'static str, err: RepositoryError) -> ApiError {
        match err {
            RepositoryError::NotFound(_) => {
                tracing::info!(app = self.logger.app(), operation, error = %err, "{phrase}");
                ApiError::NotFound("User not found")
            }
            RepositoryError::Cancelled => {
                tracing::warn!(app = self.logger.app(), operation, error = %err, "Request abandoned");
                ApiError::Cancelled
            }
            RepositoryError::Storage(_) => {
                tracing::error!(app = self.logger.app(), operation, error = %err, "{phrase}");
                ApiError::Internal(phrase)
            }
        }
    }
}

fn user_id(request: &RequestContext) -> Result<i64, ApiError> {
    request
        .param("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid user ID".to_string()))
}

fn query_i64(request: &RequestContext, name: &str) -> Option<i64> {
    request.query(name).and_then(|value| value.trim().parse().ok())
}

impl Injectable for UserHandler {
    fn dependencies() -> Vec<ComponentKey> {
        vec![
            ComponentKey::of::<dyn UserRepository>(),
            ComponentKey::of::<Logger>(),
        ]
    }

    fn inject(resolver: &Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self::new(
            resolver.resolve::<dyn UserRepository>()?,
            resolver.resolve::<Logger>()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::NewUser;
    use crate::repository::{InMemoryUserRepository, OperationContext, RepositoryResult};
    use crate::routing::PathPattern;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory store that counts calls and can be told to fail.
    #[derive(Default)]
    struct Recording {
        inner: InMemoryUserRepository,
        calls: AtomicUsize,
        broken: bool,
    }

    impl Recording {
        fn call(&self) -> RepositoryResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                Err(RepositoryError::Storage("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl UserRepository for Recording {
        fn backend(&self) -> &'static str {
            "recording"
        }

        async fn create_user(&self, ctx: &OperationContext, user: NewUser) -> RepositoryResult<User> {
            self.call()?;
            self.inner.create_user(ctx, user).await
        }

        async fn get_user_by_id(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<User> {
            self.call()?;
            self.inner.get_user_by_id(ctx, id).await
        }

        async fn list_users(
            &self,
            ctx: &OperationContext,
            limit: i64,
            offset: i64,
        ) -> RepositoryResult<Vec<User>> {
            self.call()?;
            self.inner.list_users(ctx, limit, offset).await
        }

        async fn update_user(
            &self,
            ctx: &OperationContext,
            id: i64,
            changes: NewUser,
        ) -> RepositoryResult<User> {
            self.call()?;
            self.inner.update_user(ctx, id, changes).await
        }

        async fn delete_user(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<()> {
            self.call()?;
            self.inner.delete_user(ctx, id).await
        }
    }

    fn handler(repository: Arc<Recording>) -> Arc<UserHandler> {
        let logger = Arc::new(Logger::new(&AppConfig::default()));
        Arc::new(UserHandler::new(repository, logger))
    }

    async fn request(method: Method, uri: &str, body: &str) -> RequestContext {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();
        let params = PathPattern::parse("/api/v1/users/:id")
            .unwrap()
            .matches(request.uri().path())
            .unwrap_or_default();
        RequestContext::from_request(
            request,
            params,
            OperationContext::with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_returns_201_with_entity() {
        let handler = handler(Arc::default());
        let body = r#"{"name":"Ada","email":"ada@example.com"}"#;

        let (status, Json(user)) = handler
            .create(request(Method::POST, "/api/v1/users", body).await)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(user.id > 0);
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn invalid_body_never_reaches_repository() {
        let repository = Arc::new(Recording::default());
        let handler = handler(repository.clone());
        let body = r#"{"name":"","email":"not-an-email"}"#;

        let err = handler
            .create(request(Method::POST, "/api/v1/users", body).await)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("email")));
        assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_id_is_rejected_before_storage() {
        let repository = Arc::new(Recording::default());
        let handler = handler(repository.clone());

        let err = handler
            .clone()
            .get(request(Method::GET, "/api/v1/users/abc", "").await)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::BadRequest("Invalid user ID".into()));

        let err = handler
            .update(request(Method::PUT, "/api/v1/users/x", "{}").await)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::BadRequest("Invalid user ID".into()));
        assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_user_maps_to_404() {
        let handler = handler(Arc::default());

        let get = handler
            .clone()
            .get(request(Method::GET, "/api/v1/users/99", "").await)
            .await
            .unwrap_err();
        let update = handler
            .clone()
            .update(
                request(
                    Method::PUT,
                    "/api/v1/users/99",
                    r#"{"name":"Ada","email":"ada@example.com"}"#,
                )
                .await,
            )
            .await
            .unwrap_err();
        let delete = handler
            .delete(request(Method::DELETE, "/api/v1/users/99", "").await)
            .await
            .unwrap_err();

        for err in [get, update, delete] {
            assert_eq!(err, ApiError::NotFound("User not found"));
        }
    }

    /// Shared buffer for a test-local fmt subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn not_found_is_logged_before_mapping() {
        let logs = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .with_ansi(false)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let err = handler(Arc::default())
            .delete(request(Method::DELETE, "/api/v1/users/99", "").await)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::NotFound("User not found"));

        let text = logs.text();
        assert!(text.contains("delete_user"), "{text}");
        assert!(text.contains("user 99 not found"), "{text}");
    }

    #[tokio::test]
    async fn list_applies_defaults() {
        let handler = handler(Arc::default());
        for name in ["A", "B", "C", "D", "E"] {
            let body = format!(r#"{{"name":"{name}","email":"{name}@example.com"}}"#);
            handler
                .clone()
                .create(request(Method::POST, "/api/v1/users", &body).await)
                .await
                .unwrap();
        }

        let Json(page) = handler
            .clone()
            .list(request(Method::GET, "/api/v1/users?limit=2&offset=0", "").await)
            .await
            .unwrap();
        assert_eq!((page.users.len(), page.limit, page.offset), (2, 2, 0));

        let Json(page) = handler
            .list(request(Method::GET, "/api/v1/users?limit=-1&offset=abc", "").await)
            .await
            .unwrap();
        assert_eq!((page.users.len(), page.limit, page.offset), (5, 20, 0));
    }

    #[tokio::test]
    async fn storage_failure_hides_detail() {
        let repository = Arc::new(Recording {
            broken: true,
            ..Default::default()
        });
        let handler = handler(repository);

        let err = handler
            .list(request(Method::GET, "/api/v1/users", "").await)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Internal("Failed to list users"));
    }
}
