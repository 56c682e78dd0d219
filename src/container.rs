use alloc::sync::Arc;
use core::any::type_name;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info_span};

use crate::{
    any::{Instance, ServiceKey},
    cache::{Resolved, ResolvedSet},
    config::Config,
    dependency_resolver::Resolver,
    errors::{RegisterErrorKind, ResolveErrorKind},
    finalizer::{boxed_finalizer, BoxedFinalizer, Finalizer},
    inject::Implements,
    instantiator::{boxed_factory, Activator, Constructor},
    lifetime::Lifetime,
    registry::{Registration, Registry},
    scope::{Scope, ScopeManager},
    universe::TypeUniverse,
};

/// Dependency injection container.
///
/// Services are registered with a [`Lifetime`] and resolved with their constructor dependencies.
/// The container is a cheap handle, clones share the registrations and the cached instances.
///
/// # Examples
/// ```rust
/// use injecta::{implements, Arguments, Container, Injectable, InstantiateErrorKind, KnownType, TypeUniverse};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str);
/// }
///
/// struct FileLogger;
///
/// impl Logger for FileLogger {
///     fn log(&self, _: &str) {}
/// }
///
/// impl Injectable for FileLogger {
///     fn construct(_: Arguments) -> Result<Self, InstantiateErrorKind> {
///         Ok(Self)
///     }
/// }
///
/// implements!(FileLogger => dyn Logger);
///
/// let container = Container::new(
///     TypeUniverse::new()
///         .contract::<dyn Logger>(&["log"])
///         .with(KnownType::builder::<FileLogger>().implements::<dyn Logger>()),
/// );
/// container.register_singleton::<dyn Logger>().unwrap();
///
/// let logger = container.resolve::<dyn Logger>().unwrap();
/// logger.log("started");
/// assert!(Arc::ptr_eq(&logger, &container.resolve::<dyn Logger>().unwrap()));
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new(universe: TypeUniverse) -> Self {
        Self::new_with_config(universe, Config::default())
    }

    #[must_use]
    pub fn new_with_config(universe: TypeUniverse, config: Config) -> Self {
        debug!(known_types = universe.len(), ?config, "Container created");
        Self {
            inner: Arc::new(ContainerInner {
                registry: RwLock::new(Registry::new()),
                universe,
                config,
                root: ScopeManager::new(None),
                resolved: Mutex::new(ResolvedSet::new()),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[inline]
    #[must_use]
    pub fn universe(&self) -> &TypeUniverse {
        &self.inner.universe
    }

    #[inline]
    #[must_use]
    pub fn is_registered<S>(&self) -> bool
    where
        S: ?Sized + 'static,
    {
        self.inner.registry.read().contains(&ServiceKey::of::<S>())
    }

    /// Registers `S` without an explicit implementation.
    ///
    /// A contract of the type universe gets the implementation discovery selects, right away.
    /// A known concrete type is its own implementation unless [`Config::strict_interfaces`] is set.
    ///
    /// # Errors
    /// - Returns [`RegisterErrorKind::ImplementationNotFound`] if no implementation of the contract is found
    /// - Returns [`RegisterErrorKind::Configuration`] if `S` needs an explicit implementation
    pub fn register<S>(&self, lifetime: Lifetime) -> Result<&Self, RegisterErrorKind>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let service = ServiceKey::of::<S>();
        let universe = &self.inner.universe;

        let constructor = if universe.is_contract(&service) {
            match universe.discover_conversion(service) {
                Ok(conversion) => conversion.constructor,
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            }
        } else if self.inner.config.strict_interfaces {
            let err = RegisterErrorKind::Configuration {
                key: service,
                reason: "strict interfaces require an explicit implementation",
            };
            error!("{}", err);
            return Err(err);
        } else if let Some(constructor) = universe.self_constructor(&service) {
            constructor
        } else {
            let err = RegisterErrorKind::Configuration {
                key: service,
                reason: "neither a contract nor a known type",
            };
            error!("{}", err);
            return Err(err);
        };

        Ok(self.insert(Registration::new(
            service,
            constructor.implementation,
            Activator::Constructor(constructor),
            lifetime,
        )))
    }

    /// Registers `I` as the implementation of `S`
    pub fn register_as<S, I>(&self, lifetime: Lifetime) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Implements<S>,
    {
        let constructor = Constructor::of::<S, I>();
        self.insert(Registration::new(
            ServiceKey::of::<S>(),
            constructor.implementation,
            Activator::Constructor(constructor),
            lifetime,
        ))
    }

    /// # Errors
    /// See [`Self::register`]
    #[inline]
    pub fn register_singleton<S>(&self) -> Result<&Self, RegisterErrorKind>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register::<S>(Lifetime::Singleton)
    }

    /// # Errors
    /// See [`Self::register`]
    #[inline]
    pub fn register_scoped<S>(&self) -> Result<&Self, RegisterErrorKind>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register::<S>(Lifetime::Scoped)
    }

    /// # Errors
    /// See [`Self::register`]
    #[inline]
    pub fn register_transient<S>(&self) -> Result<&Self, RegisterErrorKind>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register::<S>(Lifetime::Transient)
    }

    #[inline]
    pub fn register_singleton_as<S, I>(&self) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Implements<S>,
    {
        self.register_as::<S, I>(Lifetime::Singleton)
    }

    #[inline]
    pub fn register_scoped_as<S, I>(&self) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Implements<S>,
    {
        self.register_as::<S, I>(Lifetime::Scoped)
    }

    #[inline]
    pub fn register_transient_as<S, I>(&self) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Implements<S>,
    {
        self.register_as::<S, I>(Lifetime::Transient)
    }

    /// Registers an already built instance, it's always a singleton
    pub fn register_instance<S>(&self, instance: Arc<S>) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.insert(Registration::instance(ServiceKey::of::<S>(), Instance::new(instance)))
    }

    /// Registers a factory building `S`.
    /// Its dependencies are resolved through the [`Resolver`] it gets, no constructor injection is applied.
    pub fn register_factory<S, F>(&self, factory: F, lifetime: Lifetime) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<S>, ResolveErrorKind> + Send + Sync + 'static,
    {
        let service = ServiceKey::of::<S>();
        self.insert(Registration::new(
            service,
            service,
            Activator::Factory(boxed_factory(factory)),
            lifetime,
        ))
    }

    /// Adds a hook called with every singleton or scoped instance of `S` when it's disposed
    pub fn add_finalizer<S, F>(&self, finalizer: F) -> &Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Finalizer<S>,
    {
        let service = ServiceKey::of::<S>();
        if self
            .inner
            .registry
            .write()
            .add_finalizer(service, boxed_finalizer(finalizer))
            .is_some()
        {
            debug!(service = service.name, "Previous finalizer overwritten");
        }
        self
    }

    /// Resolves a service.
    ///
    /// Without an open scope, scoped services are shared within this call only and disposed before it returns,
    /// if [`Config::ambient_scope`] is set. Use [`Self::scoped`] to share them across several resolutions.
    /// Scoped dependencies of singletons are kept in the container's root scope until [`Self::close`].
    ///
    /// # Deadlocks
    /// Each registration is built under its own lock. Two threads resolving a dependency cycle from opposite ends
    /// may block each other before the cycle is detected on either call chain. A factory must resolve its
    /// dependencies through the [`Resolver`] it gets, resolving its own singleton through the container blocks.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::UnregisteredService`] if the service isn't registered
    /// - Returns [`ResolveErrorKind::CircularDependency`] if the service depends on itself
    /// - Returns [`ResolveErrorKind::DependencyNotFound`] if a constructor parameter can't be resolved
    /// - Returns [`ResolveErrorKind::ScopeMisuse`] if a scoped service needs a scope that isn't available
    /// - Returns [`ResolveErrorKind::Instantiate`] if a constructor fails
    pub fn resolve<S>(&self) -> Result<Arc<S>, ResolveErrorKind>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let span = info_span!("resolve", service = type_name::<S>());
        let _guard = span.enter();

        Resolver::new(self, None).resolve()
    }

    /// Opens a scope, its scoped instances are disposed when the returned handle is closed or dropped
    #[inline]
    #[must_use]
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone(), None)
    }

    /// Runs `f` in a new scope, disposed when `f` returns or panics
    pub fn scoped<T>(&self, f: impl FnOnce(&Scope) -> T) -> T {
        let scope = self.create_scope();
        f(&scope)
    }

    /// Disposes the scoped dependencies of singletons and the singletons, the last resolved first.
    ///
    /// # Warning
    /// The container stays usable, instances resolved after closing are disposed by the next call
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Container {
    #[inline]
    fn insert(&self, registration: Registration) -> &Self {
        self.inner.registry.write().insert(registration);
        self
    }

    #[inline]
    #[must_use]
    pub(crate) fn registration(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
        self.inner.registry.read().get(key)
    }

    #[inline]
    #[must_use]
    pub(crate) fn finalizer(&self, key: &ServiceKey) -> Option<BoxedFinalizer> {
        self.inner.registry.read().finalizer(key)
    }

    #[inline]
    #[must_use]
    pub(crate) fn root_scope(&self) -> &ScopeManager {
        &self.inner.root
    }

    #[inline]
    pub(crate) fn push_resolved(&self, resolved: Resolved) {
        self.inner.resolved.lock().push(resolved);
    }
}

impl Default for Container {
    #[inline]
    fn default() -> Self {
        Self::new(TypeUniverse::default())
    }
}

pub(crate) struct ContainerInner {
    registry: RwLock<Registry>,
    universe: TypeUniverse,
    config: Config,
    /// Scoped dependencies of singletons
    root: ScopeManager,
    resolved: Mutex<ResolvedSet>,
}

impl ContainerInner {
    fn close(&self) {
        self.root.dispose();

        let resolved = core::mem::take(&mut *self.resolved.lock());
        debug!(count = resolved.len(), "Disposing singletons");
        resolved.dispose();
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        self.close();
        debug!("Container closed on drop");
    }
}
