//! Service registration and scoped resolution.
//!
//! A [`ServiceCollection`] is filled in at startup and frozen into a
//! [`ServiceProvider`]. Each dispatch resolves its dependencies from a
//! [`Scope`] created from the provider, so scoped services such as a
//! persistence context are private to that dispatch.
//!
//! Services are stored by value and handed out as clones. Register shared
//! state and trait objects as `Arc<T>` / `Arc<dyn Trait>`.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::errors::{RegistrationError, ResolveError};

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Scope) -> Result<Instance, ResolveError> + Send + Sync>;

/// Service lifetime management
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// Created once and shared by every scope
    Singleton,
    /// Created once per scope
    Scoped,
    /// Created on every resolution
    Transient,
}

struct ServiceDescriptor {
    name: &'static str,
    lifetime: ServiceLifetime,
    factory: Factory,
}

/// Mutable set of service registrations.
#[derive(Default)]
pub struct ServiceCollection {
    descriptors: HashMap<TypeId, ServiceDescriptor>,
    duplicates: Vec<&'static str>,
}

impl ServiceCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service with a factory function
    pub fn add<T, F>(&mut self, lifetime: ServiceLifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        let name = type_name::<T>();
        let factory: Factory =
            Arc::new(move |scope: &Scope| factory(scope).map(|value| Arc::new(value) as Instance));

        let previous = self.descriptors.insert(
            TypeId::of::<T>(),
            ServiceDescriptor {
                name,
                lifetime,
                factory,
            },
        );
        if previous.is_some() {
            self.duplicates.push(name);
        }

        debug!(service = name, ?lifetime, "Registered service");
        self
    }

    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.add(ServiceLifetime::Singleton, factory)
    }

    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.add(ServiceLifetime::Scoped, factory)
    }

    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.add(ServiceLifetime::Transient, factory)
    }

    /// Register an existing value as a singleton.
    pub fn add_instance<T>(&mut self, value: T) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.add_singleton(move |_| Ok(value.clone()))
    }

    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.descriptors.contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Freeze the registrations.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::DuplicateService` if a service type was
    /// registered more than once.
    pub fn build(self) -> Result<ServiceProvider, RegistrationError> {
        if let Some(service) = self.duplicates.first() {
            return Err(RegistrationError::DuplicateService { service });
        }

        Ok(ServiceProvider {
            inner: Arc::new(ProviderInner {
                descriptors: self.descriptors,
                singletons: DashMap::new(),
            }),
        })
    }
}

struct ProviderInner {
    descriptors: HashMap<TypeId, ServiceDescriptor>,
    singletons: DashMap<TypeId, Instance>,
}

/// Immutable root of the service graph; cheap to clone.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    /// Start a new resolution scope.
    #[must_use]
    pub fn create_scope(&self) -> Scope {
        Scope {
            provider: self.clone(),
            scoped: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.inner.descriptors.contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn service_count(&self) -> usize {
        self.inner.descriptors.len()
    }
}

/// Bounded-lifetime resolution context.
pub struct Scope {
    provider: ServiceProvider,
    scoped: Mutex<HashMap<TypeId, Instance>>,
}

impl Scope {
    #[must_use]
    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    #[must_use]
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.provider.is_registered::<T>()
    }

    /// Resolve a registered service.
    ///
    /// # Errors
    ///
    /// `NotRegistered` if nothing is registered for `T`, or the error raised
    /// by its factory.
    pub fn resolve<T>(&self) -> Result<T, ResolveError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.try_resolve::<T>()?
            .ok_or(ResolveError::NotRegistered {
                service: type_name::<T>(),
            })
    }

    /// Resolve a service that may not be registered.
    ///
    /// `Ok(None)` means absent; `Err` means registered but not constructible.
    ///
    /// # Errors
    ///
    /// The error raised by the service factory.
    pub fn try_resolve<T>(&self) -> Result<Option<T>, ResolveError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        let Some(descriptor) = self.provider.inner.descriptors.get(&type_id) else {
            return Ok(None);
        };

        let instance = match descriptor.lifetime {
            ServiceLifetime::Singleton => self.singleton(type_id, descriptor)?,
            ServiceLifetime::Scoped => self.scoped(type_id, descriptor)?,
            ServiceLifetime::Transient => (descriptor.factory)(self)?,
        };

        instance
            .downcast_ref::<T>()
            .cloned()
            .map(Some)
            .ok_or(ResolveError::TypeMismatch {
                service: descriptor.name,
            })
    }

    fn singleton(
        &self,
        type_id: TypeId,
        descriptor: &ServiceDescriptor,
    ) -> Result<Instance, ResolveError> {
        let singletons = &self.provider.inner.singletons;
        if let Some(existing) = singletons.get(&type_id).map(|entry| Arc::clone(entry.value())) {
            return Ok(existing);
        }

        // Factory runs without the map locked; a concurrent first build keeps
        // whichever instance landed first.
        let created = (descriptor.factory)(self)?;
        trace!(service = descriptor.name, "Created singleton");
        Ok(Arc::clone(singletons.entry(type_id).or_insert(created).value()))
    }

    fn scoped(
        &self,
        type_id: TypeId,
        descriptor: &ServiceDescriptor,
    ) -> Result<Instance, ResolveError> {
        if let Some(existing) = self.scoped.lock().get(&type_id).cloned() {
            return Ok(existing);
        }

        let created = (descriptor.factory)(self)?;
        trace!(service = descriptor.name, "Created scoped service");
        Ok(Arc::clone(self.scoped.lock().entry(type_id).or_insert(created)))
    }
}
