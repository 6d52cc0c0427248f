//! In-process user store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::{NewUser, User};
use crate::repository::{OperationContext, RepositoryError, RepositoryResult, UserRepository};

#[derive(Debug, Default)]
struct Store {
    last_id: i64,
    /// Keyed by id; ids grow monotonically, so key order is creation order.
    users: BTreeMap<i64, User>,
}

/// User repository kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    store: RwLock<Store>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.store.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, ctx: &OperationContext, user: NewUser) -> RepositoryResult<User> {
        ctx.run(async {
            let mut store = self.store.write().await;
            store.last_id += 1;
            let now = Utc::now();
            let created = User {
                id: store.last_id,
                name: user.name,
                email: user.email,
                created_at: now,
                updated_at: now,
            };
            store.users.insert(created.id, created.clone());
            Ok(created)
        })
        .await
    }

    async fn get_user_by_id(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<User> {
        ctx.run(async {
            self.store
                .read()
                .await
                .users
                .get(&id)
                .cloned()
                .ok_or(RepositoryError::NotFound(id))
        })
        .await
    }

    async fn list_users(
        &self,
        ctx: &OperationContext,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<User>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let offset = usize::try_from(offset).unwrap_or(0);
        ctx.run(async {
            Ok(self
                .store
                .read()
                .await
                .users
                .values()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect())
        })
        .await
    }

    async fn update_user(
        &self,
        ctx: &OperationContext,
        id: i64,
        changes: NewUser,
    ) -> RepositoryResult<User> {
        ctx.run(async {
            let mut store = self.store.write().await;
            match store.users.get_mut(&id) {
                Some(user) => {
                    user.name = changes.name;
                    user.email = changes.email;
                    user.updated_at = Utc::now();
                    Ok(user.clone())
                }
                None => Err(RepositoryError::NotFound(id)),
            }
        })
        .await
    }

    async fn delete_user(&self, ctx: &OperationContext, id: i64) -> RepositoryResult<()> {
        ctx.run(async {
            self.store
                .write()
                .await
                .users
                .remove(&id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound(id))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn assigns_ids_and_timestamps() {
        let repo = InMemoryUserRepository::new();
        let ctx = OperationContext::background();

        let ada = repo.create_user(&ctx, new_user("Ada")).await.unwrap();
        let alan = repo.create_user(&ctx, new_user("Alan")).await.unwrap();
        assert_eq!(ada.id, 1);
        assert_eq!(alan.id, 2);
        assert_eq!(ada.created_at, ada.updated_at);
        assert_eq!(repo.get_user_by_id(&ctx, 2).await.unwrap(), alan);
    }

    #[tokio::test]
    async fn lists_in_creation_order_with_paging() {
        let repo = InMemoryUserRepository::new();
        let ctx = OperationContext::background();
        for name in ["A", "B", "C", "D", "E"] {
            repo.create_user(&ctx, new_user(name)).await.unwrap();
        }

        let page = repo.list_users(&ctx, 2, 1).await.unwrap();
        let names: Vec<_> = page.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
        assert!(repo.list_users(&ctx, 10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_missing_user() {
        let repo = InMemoryUserRepository::new();
        let ctx = OperationContext::background();

        assert_eq!(
            repo.update_user(&ctx, 9, new_user("X")).await.unwrap_err(),
            RepositoryError::NotFound(9)
        );
        assert_eq!(
            repo.delete_user(&ctx, 9).await.unwrap_err(),
            RepositoryError::NotFound(9)
        );
    }

    #[tokio::test]
    async fn update_touches_updated_at_only() {
        let repo = InMemoryUserRepository::new();
        let ctx = OperationContext::background();
        let created = repo.create_user(&ctx, new_user("Ada")).await.unwrap();

        let updated = repo
            .update_user(&ctx, created.id, new_user("Grace"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Grace");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        repo.delete_user(&ctx, created.id).await.unwrap();
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn cancelled_context_is_rejected() {
        let repo = InMemoryUserRepository::new();
        let ctx = OperationContext::background();
        ctx.cancel();

        assert_eq!(
            repo.create_user(&ctx, new_user("Ada")).await.unwrap_err(),
            RepositoryError::Cancelled
        );
        assert!(repo.is_empty().await);
    }
}
