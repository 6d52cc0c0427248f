//! User persistence.
//!
//! # Data Flow
//! ```text
//! Handler
//!     → OperationContext (cancellation + deadline)
//!     → dyn UserRepository
//!         → memory.rs   (in-process, default)
//!         → postgres.rs (sqlx pool)
//! ```
//!
//! # Design Decisions
//! - One trait, one implementation per storage backend
//! - Backend chosen when the container registers `dyn UserRepository`
//! - Repository assigns ids and timestamps; input is not validated here
//! - Listing order is creation order (`created_at`, then `id`)

pub mod context;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::container::{Container, ContainerError};
use crate::domain::{NewUser, User};

pub use context::OperationContext;
pub use memory::InMemoryUserRepository;
pub use postgres::PgUserRepository;

/// Errors surfaced by repository operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// No user with the requested id.
    #[error("user {0} not found")]
    NotFound(i64),

    /// The operation context ended before the call completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// CRUD operations on users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn create_user(&self, ctx: &OperationContext, user: NewUser) -> RepositoryResult<User>;

    async fn get_user_by_id(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<User>;

    /// Users in creation order.
    async fn list_users(
        &self,
        ctx: &OperationContext,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<User>>;

    async fn update_user(
        &self,
        ctx: &OperationContext,
        id: i64,
        changes: NewUser,
    ) -> RepositoryResult<User>;

    async fn delete_user(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<()>;

    /// Prepare the storage schema.
    async fn migrate(&self, _ctx: &OperationContext) -> RepositoryResult<()> {
        Ok(())
    }

    /// Check that storage is reachable.
    async fn ping(&self, _ctx: &OperationContext) -> RepositoryResult<()> {
        Ok(())
    }
}

/// Register `dyn UserRepository`, backed by `database.driver`.
pub fn register(container: &Container) -> Result<(), ContainerError> {
    container.register::<dyn UserRepository, _>(|resolver| {
        let config = resolver.resolve::<AppConfig>()?;
        let repository: Arc<dyn UserRepository> = match config.database.driver.as_str() {
            "memory" => Arc::new(InMemoryUserRepository::new()),
            "postgres" => Arc::new(
                PgUserRepository::connect_lazy(&config.database)
                    .map_err(|e| resolver.construction_error(e))?,
            ),
            other => {
                return Err(resolver.construction_error(format!(
                    "unsupported database driver `{other}`"
                )))
            }
        };
        tracing::info!(backend = repository.backend(), "User repository ready");
        Ok(repository)
    })
}
