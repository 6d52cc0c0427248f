//! Container error taxonomy.

use std::fmt::Display;
use thiserror::Error;

/// Errors raised while registering or resolving components.
///
/// These are programmer errors surfaced at startup. Callers treat them as
/// fatal; nothing in the container retries or substitutes a default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// The identifier already has a descriptor in this container.
    #[error("component `{0}` is already registered")]
    DuplicateRegistration(&'static str),

    /// Nothing was registered under the requested identifier.
    #[error("component `{0}` is not registered")]
    NotRegistered(&'static str),

    /// The identifier (transitively) depends on itself.
    #[error("circular dependency detected: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<&'static str> },

    /// The component's own factory failed.
    #[error("failed to construct `{component}`: {message}")]
    Construction {
        component: &'static str,
        message: String,
    },
}

impl ContainerError {
    /// Wrap an arbitrary construction failure for `component`.
    pub fn construction(component: &'static str, err: impl Display) -> Self {
        ContainerError::Construction {
            component,
            message: err.to_string(),
        }
    }

    pub fn is_not_registered(&self) -> bool {
        matches!(self, ContainerError::NotRegistered(_))
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, ContainerError::CircularDependency { .. })
    }
}
