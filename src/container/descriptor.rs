//! Component descriptors and their resolution state.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::container::error::ContainerError;
use crate::container::registry::Resolver;

/// Type-erased singleton. Holds an `Arc<T>` so `T` may be unsized.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// Type-erased factory.
pub(crate) type ErasedFactory =
    Box<dyn Fn(&Resolver<'_>) -> Result<Instance, ContainerError> + Send + Sync>;

/// Type-level identifier of a component.
///
/// Equality and hashing use the `TypeId` only; the name is carried for
/// error messages and logs.
#[derive(Clone, Copy)]
pub struct ComponentKey {
    id: TypeId,
    name: &'static str,
}

impl ComponentKey {
    /// Key for `T`. Works for trait object types such as `dyn UserRepository`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentKey {}

impl Hash for ComponentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Observable resolution state of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Registered, factory not yet invoked.
    Unresolved,
    /// Factory is running.
    Resolving,
    /// Instance cached.
    Resolved,
    /// Factory failed; the error is cached.
    Failed,
}

pub(crate) enum Slot {
    Unresolved,
    Resolving,
    Resolved(Instance),
    Failed(ContainerError),
}

/// Container-internal record for one registered component.
pub(crate) struct Descriptor {
    pub(crate) key: ComponentKey,
    pub(crate) dependencies: Vec<ComponentKey>,
    factory: Option<ErasedFactory>,
    slot: Mutex<Slot>,
}

impl Descriptor {
    pub(crate) fn with_factory(
        key: ComponentKey,
        dependencies: Vec<ComponentKey>,
        factory: ErasedFactory,
    ) -> Self {
        Self {
            key,
            dependencies,
            factory: Some(factory),
            slot: Mutex::new(Slot::Unresolved),
        }
    }

    pub(crate) fn with_instance(key: ComponentKey, instance: Instance) -> Self {
        Self {
            key,
            dependencies: Vec::new(),
            factory: None,
            slot: Mutex::new(Slot::Resolved(instance)),
        }
    }

    /// Lock the slot. A panic inside a factory never happens while the slot
    /// lock is held, so poisoning carries no broken invariant.
    pub(crate) fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ResolutionState {
        match &*self.slot() {
            Slot::Unresolved => ResolutionState::Unresolved,
            Slot::Resolving => ResolutionState::Resolving,
            Slot::Resolved(_) => ResolutionState::Resolved,
            Slot::Failed(_) => ResolutionState::Failed,
        }
    }

    /// Cached outcome, if resolution already finished.
    pub(crate) fn settled(&self) -> Option<Result<Instance, ContainerError>> {
        match &*self.slot() {
            Slot::Resolved(instance) => Some(Ok(Arc::clone(instance))),
            Slot::Failed(err) => Some(Err(err.clone())),
            Slot::Unresolved | Slot::Resolving => None,
        }
    }

    pub(crate) fn build(&self, resolver: &Resolver<'_>) -> Result<Instance, ContainerError> {
        match &self.factory {
            Some(factory) => factory(resolver),
            None => Err(ContainerError::construction(
                self.key.name(),
                "registered without a factory",
            )),
        }
    }
}

/// Marks a descriptor `Resolving` and guarantees it leaves that state, even
/// if the factory unwinds.
pub(crate) struct ResolvingGuard<'a> {
    descriptor: &'a Descriptor,
    settled: bool,
}

impl<'a> ResolvingGuard<'a> {
    pub(crate) fn new(descriptor: &'a Descriptor) -> Self {
        *descriptor.slot() = Slot::Resolving;
        Self {
            descriptor,
            settled: false,
        }
    }

    pub(crate) fn settle(
        mut self,
        result: Result<Instance, ContainerError>,
    ) -> Result<Instance, ContainerError> {
        self.settled = true;
        let mut slot = self.descriptor.slot();
        match result {
            Ok(instance) => {
                *slot = Slot::Resolved(Arc::clone(&instance));
                Ok(instance)
            }
            Err(err) => {
                *slot = Slot::Failed(err.clone());
                Err(err)
            }
        }
    }
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            *self.descriptor.slot() = Slot::Failed(ContainerError::construction(
                self.descriptor.key.name(),
                "factory panicked",
            ));
        }
    }
}
