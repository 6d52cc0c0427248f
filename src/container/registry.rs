//! Component registry and lazy singleton resolution.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use crate::container::descriptor::{
    ComponentKey, Descriptor, ErasedFactory, Instance, ResolutionState, ResolvingGuard,
};
use crate::container::error::ContainerError;
use crate::container::injectable::Injectable;

/// Registry of component factories with lazily resolved singletons.
pub struct Container {
    descriptors: DashMap<TypeId, Arc<Descriptor>>,
    /// Held by the outermost `resolve` for the whole dependency walk.
    resolution: Mutex<()>,
}

impl Container {
    /// Create an empty container.
    pub fn new() -> Self {
        Self {
            descriptors: DashMap::new(),
            resolution: Mutex::new(()),
        }
    }

    /// Register a factory for `T`.
    ///
    /// `T` may be a trait object type; the factory then returns the concrete
    /// implementation coerced to `Arc<dyn Trait>`.
    pub fn register<T, F>(&self, factory: F) -> Result<(), ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, ContainerError> + Send + Sync + 'static,
    {
        let erased: ErasedFactory = Box::new(move |resolver| {
            factory(resolver).map(|instance| Arc::new(instance) as Instance)
        });
        self.insert(Descriptor::with_factory(
            ComponentKey::of::<T>(),
            Vec::new(),
            erased,
        ))
    }

    /// Register a component that declares its dependencies.
    ///
    /// Every key from `T::dependencies()` is resolved before `T::inject`
    /// runs.
    pub fn register_injectable<T: Injectable>(&self) -> Result<(), ContainerError> {
        let erased: ErasedFactory = Box::new(|resolver| {
            T::inject(resolver).map(|component| Arc::new(Arc::new(component)) as Instance)
        });
        self.insert(Descriptor::with_factory(
            ComponentKey::of::<T>(),
            T::dependencies(),
            erased,
        ))
    }

    /// Register an already-built instance.
    pub fn register_value<T>(&self, value: Arc<T>) -> Result<(), ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.insert(Descriptor::with_instance(
            ComponentKey::of::<T>(),
            Arc::new(value),
        ))
    }

    fn insert(&self, descriptor: Descriptor) -> Result<(), ContainerError> {
        let key = descriptor.key;
        match self.descriptors.entry(key.id()) {
            Entry::Occupied(_) => Err(ContainerError::DuplicateRegistration(key.name())),
            Entry::Vacant(slot) => {
                tracing::debug!(component = key.name(), "Component registered");
                slot.insert(Arc::new(descriptor));
                Ok(())
            }
        }
    }

    /// Resolve the singleton registered under `T`.
    pub fn resolve<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = ComponentKey::of::<T>();
        let descriptor = self.descriptor(key)?;

        // Fast path: no lock needed once settled.
        if let Some(settled) = descriptor.settled() {
            return settled.and_then(|instance| downcast::<T>(instance, key));
        }

        let _resolution = self
            .resolution
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let resolver = Resolver {
            container: self,
            path: Vec::new(),
        };
        resolver.resolve::<T>()
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.descriptors.contains_key(&TypeId::of::<T>())
    }

    /// Resolution state of `T`, or `None` if unregistered.
    pub fn state_of<T: ?Sized + 'static>(&self) -> Option<ResolutionState> {
        self.descriptors
            .get(&TypeId::of::<T>())
            .map(|descriptor| descriptor.state())
    }

    /// All registered components with their state, sorted by name.
    pub fn registered(&self) -> Vec<(&'static str, ResolutionState)> {
        let mut components: Vec<_> = self
            .descriptors
            .iter()
            .map(|entry| (entry.key.name(), entry.state()))
            .collect();
        components.sort_by(|a, b| a.0.cmp(b.0));
        components
    }

    /// Check the declared dependency graph without constructing anything.
    ///
    /// Reports the first missing declared dependency or declared cycle.
    /// Dependencies that a plain factory resolves on its own are invisible
    /// here and surface only at resolution time.
    pub fn validate(&self) -> Result<(), ContainerError> {
        let mut keys: Vec<ComponentKey> = self
            .descriptors
            .iter()
            .map(|entry| entry.key)
            .collect();
        keys.sort_by(|a, b| a.name().cmp(b.name()));

        let mut done = HashSet::new();
        for key in keys {
            self.visit(key, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        key: ComponentKey,
        path: &mut Vec<ComponentKey>,
        done: &mut HashSet<ComponentKey>,
    ) -> Result<(), ContainerError> {
        if done.contains(&key) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|k| *k == key) {
            return Err(cycle(&path[start..], key));
        }
        let descriptor = self.descriptor(key)?;
        path.push(key);
        for dependency in &descriptor.dependencies {
            self.visit(*dependency, path, done)?;
        }
        path.pop();
        done.insert(key);
        Ok(())
    }

    fn descriptor(&self, key: ComponentKey) -> Result<Arc<Descriptor>, ContainerError> {
        self.descriptors
            .get(&key.id())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ContainerError::NotRegistered(key.name()))
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle passed to factories for resolving their own dependencies.
///
/// Carries the chain of components currently under construction so a
/// component that reaches itself again is reported as a cycle instead of
/// recursing.
pub struct Resolver<'c> {
    container: &'c Container,
    path: Vec<ComponentKey>,
}

impl Resolver<'_> {
    /// Resolve a dependency of the component being built.
    pub fn resolve<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = ComponentKey::of::<T>();
        let instance = self.resolve_key(key)?;
        downcast::<T>(instance, key)
    }

    /// The component whose factory is currently running, if any.
    pub fn component(&self) -> Option<ComponentKey> {
        self.path.last().copied()
    }

    /// Wrap a failure of the current factory as a construction error.
    pub fn construction_error(&self, err: impl Display) -> ContainerError {
        let component = self.component().map_or("<root>", |key| key.name());
        ContainerError::construction(component, err)
    }

    fn resolve_key(&self, key: ComponentKey) -> Result<Instance, ContainerError> {
        if let Some(start) = self.path.iter().position(|k| *k == key) {
            let err = cycle(&self.path[start..], key);
            tracing::error!(error = %err, "Dependency cycle");
            return Err(err);
        }

        let descriptor = self.container.descriptor(key)?;
        if let Some(settled) = descriptor.settled() {
            return settled;
        }

        let guard = ResolvingGuard::new(&descriptor);
        let child = Resolver {
            container: self.container,
            path: self.path.iter().copied().chain(Some(key)).collect(),
        };

        let result = descriptor
            .dependencies
            .iter()
            .try_for_each(|dependency| child.resolve_key(*dependency).map(|_| ()))
            .and_then(|()| descriptor.build(&child));

        match &result {
            Ok(_) => tracing::debug!(component = key.name(), "Component resolved"),
            Err(e) => tracing::warn!(component = key.name(), error = %e, "Component failed"),
        }
        guard.settle(result)
    }
}

fn downcast<T>(instance: Instance, key: ComponentKey) -> Result<Arc<T>, ContainerError>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| ContainerError::construction(key.name(), "instance has an unexpected type"))
}

fn cycle(path: &[ComponentKey], repeated: ComponentKey) -> ContainerError {
    ContainerError::CircularDependency {
        cycle: path
            .iter()
            .chain(Some(&repeated))
            .map(|key| key.name())
            .collect(),
    }
}
