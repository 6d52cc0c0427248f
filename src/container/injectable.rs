//! Constructor injection for container-managed components.

use crate::container::descriptor::ComponentKey;
use crate::container::error::ContainerError;
use crate::container::registry::Resolver;

/// A component built from dependencies it declares up front.
///
/// The container resolves every key returned by [`dependencies`] before it
/// calls [`inject`], so `inject` only fetches already-built instances and
/// passes them to the component's constructor.
///
/// [`dependencies`]: Injectable::dependencies
/// [`inject`]: Injectable::inject
///
/// # Example
/// ```ignore
/// impl Injectable for UserHandler {
///     fn dependencies() -> Vec<ComponentKey> {
///         vec![ComponentKey::of::<dyn UserRepository>(), ComponentKey::of::<Logger>()]
///     }
///
///     fn inject(resolver: &Resolver<'_>) -> Result<Self, ContainerError> {
///         Ok(Self::new(resolver.resolve()?, resolver.resolve()?))
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Identifiers this component needs.
    fn dependencies() -> Vec<ComponentKey>;

    /// Build the component from its resolved dependencies.
    fn inject(resolver: &Resolver<'_>) -> Result<Self, ContainerError>;
}
