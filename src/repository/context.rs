//! Cancellable operation context for repository calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::repository::RepositoryError;

/// Cancellation signal and optional deadline carried by every repository
/// call.
///
/// A call whose context is cancelled, or whose deadline passes, stops
/// waiting on storage and fails with [`RepositoryError::Cancelled`].
#[derive(Debug, Clone)]
pub struct OperationContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context that expires after `timeout`.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Child context: cancelled with `self`, and additionally on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Guard that cancels this context when dropped.
    ///
    /// Held by a request handler so that an abandoned request (its future
    /// dropped on client disconnect) cancels outstanding storage work.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `operation` until it finishes, the context is cancelled, or the
    /// deadline passes.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        if self.is_done() {
            return Err(RepositoryError::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(RepositoryError::Cancelled),
            _ = deadline => Err(RepositoryError::Cancelled),
            result = operation => result,
        }
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::background()
    }
}
