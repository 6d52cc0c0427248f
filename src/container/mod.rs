//! Service composition container.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     register::<T>(factory) / register_injectable::<T>()
//!     → Descriptor { key, dependencies, factory, state = Unresolved }
//!
//! Resolution (resolve::<T>()):
//!     cached?          → return the same Arc<T>
//!     Unresolved       → Resolving
//!                      → resolve declared dependencies (recursively)
//!                      → invoke factory with a Resolver
//!                      → Resolved(instance) | Failed(error)
//!     on current path  → CircularDependency(A -> B -> A)
//!     unknown key      → NotRegistered
//! ```
//!
//! # Design Decisions
//! - Identifiers are type keys (`TypeId`), including trait object types
//! - Components are singletons for the lifetime of the container
//! - Failures are cached like instances: a factory runs at most once
//! - One coarse resolution lock held by the outermost resolve; nested
//!   resolutions go through the `Resolver` and never re-acquire it
//! - No global container: `main` owns one and passes it by reference

pub mod descriptor;
pub mod error;
pub mod injectable;
pub mod registry;

pub use descriptor::{ComponentKey, ResolutionState};
pub use error::ContainerError;
pub use injectable::Injectable;
pub use registry::{Container, Resolver};
