//! PostgreSQL user store backed by a `sqlx` pool.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::domain::{NewUser, User};
use crate::repository::{OperationContext, RepositoryError, RepositoryResult, UserRepository};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT        NOT NULL,
    email       TEXT        NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const COLUMNS: &str = "id, name, email, created_at, updated_at";

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Storage(err.to_string())
    }
}

/// User repository stored in a PostgreSQL `users` table.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool from configuration without opening a connection yet.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_open_conns)
            .max_lifetime(Duration::from_secs(config.conn_max_lifetime))
            .connect_lazy_with(connect_options(config)?);
        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_open_conns,
            "PostgreSQL pool configured"
        );
        Ok(Self::new(pool))
    }
}

/// Connection settings from configuration; credentials are passed as-is,
/// never spliced into a URL.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let ssl_mode: PgSslMode = config.ssl_mode.parse()?;
    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .ssl_mode(ssl_mode))
}

#[async_trait]
impl UserRepository for PgUserRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create_user(&self, ctx: &OperationContext, user: NewUser) -> RepositoryResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, created_at, updated_at) \
             VALUES ($1, $2, $3, $3) RETURNING {COLUMNS}"
        );
        ctx.run(async {
            sqlx::query_as::<_, User>(&sql)
                .bind(&user.name)
                .bind(&user.email)
                .bind(Utc::now())
                .fetch_one(&self.pool)
                .await
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn get_user_by_id(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<User> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        ctx.run(async {
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::from)
                .and_then(|row| row.ok_or(RepositoryError::NotFound(id)))
        })
        .await
    }

    async fn list_users(
        &self,
        ctx: &OperationContext,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<User>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM users ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        );
        ctx.run(async {
            sqlx::query_as::<_, User>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn update_user(
        &self,
        ctx: &OperationContext,
        id: i64,
        changes: NewUser,
    ) -> RepositoryResult<User> {
        let sql = format!(
            "UPDATE users SET name = $1, email = $2, updated_at = $3 \
             WHERE id = $4 RETURNING {COLUMNS}"
        );
        ctx.run(async {
            sqlx::query_as::<_, User>(&sql)
                .bind(&changes.name)
                .bind(&changes.email)
                .bind(Utc::now())
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::from)
                .and_then(|row| row.ok_or(RepositoryError::NotFound(id)))
        })
        .await
    }

    async fn delete_user(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<()> {
        ctx.run(async {
            match sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
            {
                Ok(done) if done.rows_affected() == 0 => Err(RepositoryError::NotFound(id)),
                Ok(_) => Ok(()),
                Err(e) => Err(RepositoryError::from(e)),
            }
        })
        .await
    }

    async fn migrate(&self, ctx: &OperationContext) -> RepositoryResult<()> {
        ctx.run(async {
            sqlx::query(CREATE_TABLE)
                .execute(&self.pool)
                .await
                .map(|_| tracing::info!("users table ready"))
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn ping(&self, ctx: &OperationContext) -> RepositoryResult<()> {
        ctx.run(async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(RepositoryError::from)
        })
        .await
    }
}
