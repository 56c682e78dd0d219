use alloc::{sync::Arc, vec::Vec};
use core::cell::{Cell, OnceCell, RefCell};
use tracing::{debug, debug_span, error, warn};

use crate::{
    any::{Instance, ServiceKey},
    cache::Resolved,
    container::Container,
    errors::{InstantiatorErrorKind, ResolveErrorKind},
    finalizer::bind_finalizer,
    instantiator::{Activator, Built},
    lifetime::Lifetime,
    registry::Registration,
    scope::ScopeManager,
};

/// Where scoped services of the service being built are cached
#[derive(Clone, Copy)]
enum ScopeContext<'a> {
    /// Scope of an open [`crate::Scope`] handle
    Explicit(&'a ScopeManager),
    /// Scope opened by the call chain itself, disposed with the resolver
    Implicit,
    /// Root scope of the container, used while building singletons
    Root,
}

/// Context of one resolution call chain.
///
/// Carries the scope used for scoped services and the keys currently under construction,
/// so a key entered twice on the same chain is reported as a cycle.
/// Factories receive the resolver and resolve their dependencies through it.
///
/// Scoped services resolved without an open scope are cached in a scope owned by the resolver,
/// so they're shared within the call chain only and disposed when it finishes.
pub struct Resolver<'a> {
    container: &'a Container,
    context: Cell<ScopeContext<'a>>,
    implicit: OnceCell<ScopeManager>,
    chain: RefCell<Vec<ServiceKey>>,
}

/// Removes its key from the chain on every exit path
struct ChainEntry<'r> {
    chain: &'r RefCell<Vec<ServiceKey>>,
}

impl Drop for ChainEntry<'_> {
    fn drop(&mut self) {
        self.chain.borrow_mut().pop();
    }
}

impl<'a> Resolver<'a> {
    #[inline]
    #[must_use]
    pub(crate) const fn new(container: &'a Container, scope: Option<&'a ScopeManager>) -> Self {
        let context = match scope {
            Some(scope) => ScopeContext::Explicit(scope),
            None => ScopeContext::Implicit,
        };
        Self {
            container,
            context: Cell::new(context),
            implicit: OnceCell::new(),
            chain: RefCell::new(Vec::new()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn container(&self) -> &'a Container {
        self.container
    }

    /// Resolves a service as a dependency of the service being built
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::UnregisteredService`] if the service has no registration
    /// - Returns [`ResolveErrorKind::CircularDependency`] if the service is already being built on this chain
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the registration produces another type
    pub fn resolve<S>(&self) -> Result<Arc<S>, ResolveErrorKind>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let expected = ServiceKey::of::<S>();
        let instance = self.resolve_key(expected)?;

        instance.downcast().ok_or_else(|| {
            let err = ResolveErrorKind::IncorrectType {
                expected,
                actual: instance.key(),
            };
            error!("{}", err);
            err
        })
    }

    pub(crate) fn resolve_key(&self, key: ServiceKey) -> Result<Instance, ResolveErrorKind> {
        let span = debug_span!("resolve", dependency = key.name);
        let _guard = span.enter();

        let Some(registration) = self.container.registration(&key) else {
            let err = ResolveErrorKind::UnregisteredService { key };
            warn!("{}", err);
            return Err(err);
        };

        let _entry = self.enter(key)?;

        match registration.lifetime {
            Lifetime::Singleton => registration.singleton.get_or_try_init(|| {
                // Scoped dependencies of a singleton live as long as the container
                let context = self.context.replace(ScopeContext::Root);
                let built = self.build(&registration);
                self.context.set(context);

                let Built { instance, disposers } = built?;
                self.container.push_resolved(Resolved { key, disposers });
                Ok(instance)
            }),
            Lifetime::Scoped => self.scope(key)?.get_or_create(key, || self.build(&registration)),
            Lifetime::Transient => self.build(&registration).map(|built| built.instance),
        }
    }

    fn scope(&self, key: ServiceKey) -> Result<&ScopeManager, ResolveErrorKind> {
        match self.context.get() {
            ScopeContext::Explicit(scope) => Ok(scope),
            _ if !self.container.config().ambient_scope => {
                let err = ResolveErrorKind::ScopeMisuse { key };
                error!("{}", err);
                Err(err)
            }
            ScopeContext::Implicit => Ok(self.implicit.get_or_init(|| {
                let scope = ScopeManager::new(None);
                debug!(scope = scope.id(), "Implicit scope opened");
                scope
            })),
            ScopeContext::Root => Ok(self.container.root_scope()),
        }
    }

    fn enter(&self, key: ServiceKey) -> Result<ChainEntry<'_>, ResolveErrorKind> {
        let mut chain = self.chain.borrow_mut();
        if chain.contains(&key) {
            let mut cycle = chain.clone();
            cycle.push(key);

            let err = ResolveErrorKind::CircularDependency { key, chain: cycle };
            error!("{}", err);
            return Err(err);
        }
        chain.push(key);

        Ok(ChainEntry { chain: &self.chain })
    }

    fn build(&self, registration: &Registration) -> Result<Built, ResolveErrorKind> {
        let mut built = match &registration.activator {
            Activator::Instance(instance) => return Ok(Built::new(instance.clone())),
            Activator::Factory(factory) => Built::new(factory(self)?),
            Activator::Constructor(constructor) => match constructor.instantiate(registration.service, self) {
                Ok(built) => built,
                Err(InstantiatorErrorKind::Deps(err)) => return Err(err),
                Err(InstantiatorErrorKind::Factory(err)) => {
                    let err = ResolveErrorKind::Instantiate(err);
                    error!("{}", err);
                    return Err(err);
                }
            },
        };

        if registration.lifetime.is_cached() {
            if let Some(finalizer) = self.container.finalizer(&registration.service) {
                built.disposers.push(bind_finalizer(finalizer, built.instance.clone()));
            }
        }

        Ok(built)
    }
}

impl Drop for Resolver<'_> {
    fn drop(&mut self) {
        if let Some(scope) = self.implicit.take() {
            scope.dispose();
            debug!(scope = scope.id(), "Implicit scope closed");
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::{
        any::ServiceKey, Arguments, Config, Container, Injectable, InstantiateErrorKind, Lifetime, Parameter,
        ResolveErrorKind, TypeUniverse,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
        vec,
        vec::Vec,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    struct Ping(Arc<Pong>);
    struct Pong(Arc<Ping>);

    impl Injectable for Ping {
        fn parameters() -> Vec<Parameter> {
            vec![Parameter::new::<Pong>("pong")]
        }

        fn construct(arguments: Arguments) -> Result<Self, InstantiateErrorKind> {
            Ok(Self(arguments.get("pong")?))
        }
    }

    impl Injectable for Pong {
        fn parameters() -> Vec<Parameter> {
            vec![Parameter::new::<Ping>("ping")]
        }

        fn construct(arguments: Arguments) -> Result<Self, InstantiateErrorKind> {
            Ok(Self(arguments.get("ping")?))
        }
    }

    struct Settings;
    struct Database(Arc<Settings>);

    impl Injectable for Settings {
        fn construct(_: Arguments) -> Result<Self, InstantiateErrorKind> {
            Ok(Self)
        }
    }

    impl Injectable for Database {
        fn parameters() -> Vec<Parameter> {
            vec![Parameter::new::<Settings>("config")]
        }

        fn construct(arguments: Arguments) -> Result<Self, InstantiateErrorKind> {
            Ok(Self(arguments.get("config")?))
        }
    }

    #[test]
    #[traced_test]
    fn test_cycle_detected() {
        let container = Container::new(TypeUniverse::new());
        container.register_transient_as::<Ping, Ping>().register_transient_as::<Pong, Pong>();

        let Err(ResolveErrorKind::CircularDependency { key, chain }) = container.resolve::<Ping>() else {
            panic!("cycle expected");
        };
        assert_eq!(key.short_name(), "Ping");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.first(), chain.last());

        // The chain is unwound, a retry reports the same cycle again
        assert!(matches!(
            container.resolve::<Pong>(),
            Err(ResolveErrorKind::CircularDependency { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_factory_cycle_detected() {
        let container = Container::new(TypeUniverse::new());
        container.register_factory::<Database, _>(
            |resolver| {
                let _ = resolver.resolve::<Database>()?;
                Ok(Arc::new(Database(Arc::new(Settings))))
            },
            Lifetime::Transient,
        );

        assert!(matches!(
            container.resolve::<Database>(),
            Err(ResolveErrorKind::CircularDependency { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_dependency_not_found() {
        let container = Container::new(TypeUniverse::new());
        container.register_transient_as::<Database, Database>();

        let Err(ResolveErrorKind::DependencyNotFound {
            service,
            parameter,
            expected,
        }) = container.resolve::<Database>()
        else {
            panic!("missing dependency expected");
        };
        assert_eq!(service.short_name(), "Database");
        assert_eq!(parameter, "config");
        assert_eq!(expected.short_name(), "Settings");
    }

    #[test]
    #[traced_test]
    fn test_singleton_dependency_shared() {
        let container = Container::new(TypeUniverse::new());
        container
            .register_singleton_as::<Settings, Settings>()
            .register_transient_as::<Database, Database>();

        let first = container.resolve::<Database>().unwrap();
        let second = container.resolve::<Database>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.0, &second.0));
    }

    #[test]
    #[traced_test]
    fn test_scope_misuse_without_ambient_scope() {
        let container = Container::new_with_config(
            TypeUniverse::new(),
            Config {
                ambient_scope: false,
                ..Config::default()
            },
        );
        container.register_scoped_as::<Settings, Settings>();

        assert!(matches!(
            container.resolve::<Settings>(),
            Err(ResolveErrorKind::ScopeMisuse { .. })
        ));

        let scope = container.create_scope();
        assert!(scope.resolve::<Settings>().is_ok());
    }

    #[test]
    #[traced_test]
    fn test_singleton_scoped_dependency_uses_root_scope() {
        let container = Container::new(TypeUniverse::new());
        container
            .register_scoped_as::<Settings, Settings>()
            .register_singleton_as::<Database, Database>();

        let scope = container.create_scope();
        let database = scope.resolve::<Database>().unwrap();
        let scoped = scope.resolve::<Settings>().unwrap();
        drop(scope);

        assert!(!Arc::ptr_eq(&database.0, &scoped));
        let root = container
            .root_scope()
            .get_or_create(ServiceKey::of::<Settings>(), || Err(()))
            .unwrap();
        assert!(Arc::ptr_eq(&database.0, &root.downcast::<Settings>().unwrap()));
        assert!(!Arc::ptr_eq(&database.0, &container.resolve::<Settings>().unwrap()));
    }

    #[test]
    #[traced_test]
    fn test_implicit_scope_shared_within_call() {
        let container = Container::new(TypeUniverse::new());
        container.register_scoped_as::<Settings, Settings>().register_factory::<Database, _>(
            |resolver| {
                let first = resolver.resolve::<Settings>()?;
                assert!(Arc::ptr_eq(&first, &resolver.resolve::<Settings>()?));
                Ok(Arc::new(Database(first)))
            },
            Lifetime::Transient,
        );

        let first = container.resolve::<Database>().unwrap();
        let second = container.resolve::<Database>().unwrap();

        assert!(!Arc::ptr_eq(&first.0, &second.0));
        assert!(logs_contain("Implicit scope closed"));
    }

    #[test]
    #[traced_test]
    fn test_factory_error_propagated() {
        let call_count = Arc::new(AtomicU8::new(0));
        let container = Container::new(TypeUniverse::new());
        container.register_factory::<Settings, _>(
            {
                let call_count = call_count.clone();
                move |_| {
                    call_count.fetch_add(1, Ordering::SeqCst);
                    Err(InstantiateErrorKind::Custom(anyhow::anyhow!("config unavailable")).into())
                }
            },
            Lifetime::Singleton,
        );

        assert!(matches!(
            container.resolve::<Settings>(),
            Err(ResolveErrorKind::Instantiate(InstantiateErrorKind::Custom(_)))
        ));
        // Failed singletons aren't cached
        assert!(container.resolve::<Settings>().is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }
}
