use alloc::sync::Arc;
use core::{
    any::type_name,
    sync::atomic::{AtomicU64, Ordering},
};
use parking_lot::Mutex;
use tracing::{debug, info_span};

use crate::{
    any::{Instance, ServiceKey},
    cache::{Cache, Resolved},
    container::Container,
    dependency_resolver::Resolver,
    errors::ResolveErrorKind,
    instantiator::Built,
};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(0);

/// Cache of scoped instances of one unit of work.
///
/// Every key has its own cell: callers of the same key wait for one build, builds of different keys don't block
/// each other. The cache lock is never held while building.
pub(crate) struct ScopeManager {
    id: u64,
    parent: Option<u64>,
    cache: Mutex<Cache>,
}

impl ScopeManager {
    #[must_use]
    pub(crate) fn new(parent: Option<u64>) -> Self {
        Self {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            parent,
            cache: Mutex::new(Cache::new()),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub(crate) const fn parent(&self) -> Option<u64> {
        self.parent
    }

    #[inline]
    #[must_use]
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns the cached instance of `key` or builds, caches and returns it.
    /// At most one instance of a key is built per scope.
    pub(crate) fn get_or_create<E>(&self, key: ServiceKey, build: impl FnOnce() -> Result<Built, E>) -> Result<Instance, E> {
        let cell = self.cache.lock().cell(key);

        if let Some(instance) = cell.get() {
            debug!(scope = self.id, "Found in scope cache");
            return Ok(instance);
        }
        debug!(scope = self.id, "Not found in scope cache");

        cell.get_or_try_init(|| {
            let Built { instance, disposers } = build()?;
            self.cache.lock().push_resolved(Resolved { key, disposers });
            debug!(scope = self.id, "Cached");
            Ok(instance)
        })
    }

    /// Disposes every cached instance in reverse resolution order and empties the cache.
    /// Instances resolved after that are disposed by the next call.
    pub(crate) fn dispose(&self) {
        let (cells, resolved) = self.cache.lock().take();
        debug!(scope = self.id, count = resolved.len(), "Disposing scope");

        resolved.dispose();
        drop(cells);
    }
}

/// Handle of an open scope.
///
/// Scoped services resolved through the handle are cached in it and disposed when it's closed or dropped.
/// Nested scopes are created with [`Scope::create_scope`] and never share instances with their parent.
pub struct Scope {
    container: Container,
    manager: Arc<ScopeManager>,
}

impl Scope {
    #[must_use]
    pub(crate) fn new(container: Container, parent: Option<u64>) -> Self {
        let manager = Arc::new(ScopeManager::new(parent));
        debug!(scope = manager.id(), parent = ?parent, "Scope opened");
        Self { container, manager }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.manager.id()
    }

    #[inline]
    #[must_use]
    pub fn parent_id(&self) -> Option<u64> {
        self.manager.parent()
    }

    #[inline]
    #[must_use]
    pub const fn container(&self) -> &Container {
        &self.container
    }

    /// Resolves a service, caching scoped services in this scope
    #[allow(clippy::missing_errors_doc)]
    pub fn resolve<S>(&self) -> Result<Arc<S>, ResolveErrorKind>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let span = info_span!("resolve", service = type_name::<S>(), scope = self.manager.id());
        let _guard = span.enter();

        Resolver::new(&self.container, Some(&*self.manager)).resolve()
    }

    /// Opens a child scope, it has its own cache and is closed independently of this one
    #[must_use]
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.container.clone(), Some(self.manager.id()))
    }

    /// Disposes the instances cached in the scope
    #[inline]
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.manager.dispose();
        debug!(scope = self.manager.id(), "Scope closed");
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::ScopeManager;
    use crate::{
        any::{Instance, ServiceKey},
        finalizer::Disposer,
        instantiator::Built,
    };

    use alloc::{
        boxed::Box,
        format,
        string::{String, ToString as _},
        sync::Arc,
        vec,
    };
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    struct Session;

    fn build(build_count: &AtomicU8, dispose_count: &Arc<AtomicU8>) -> Result<Built, ()> {
        build_count.fetch_add(1, Ordering::SeqCst);
        let dispose_count = dispose_count.clone();
        let disposer: Disposer = Box::new(move || {
            dispose_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        Ok(Built {
            instance: Instance::new(Arc::new(Session)),
            disposers: vec![disposer],
        })
    }

    #[test]
    #[traced_test]
    fn test_get_or_create_caches() {
        let manager = ScopeManager::new(None);
        let key = ServiceKey::of::<Session>();
        let build_count = AtomicU8::new(0);
        let dispose_count = Arc::new(AtomicU8::new(0));

        let first = manager.get_or_create(key, || build(&build_count, &dispose_count)).unwrap();
        let second = manager.get_or_create(key, || build(&build_count, &dispose_count)).unwrap();

        assert_eq!(build_count.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first.downcast::<Session>().unwrap(), &second.downcast::<Session>().unwrap()));
        assert_eq!(manager.len(), 1);
        assert!(logs_contain("Found in scope cache"));
    }

    #[test]
    #[traced_test]
    fn test_dispose_exactly_once() {
        let manager = ScopeManager::new(None);
        let key = ServiceKey::of::<Session>();
        let build_count = AtomicU8::new(0);
        let dispose_count = Arc::new(AtomicU8::new(0));

        manager.get_or_create(key, || build(&build_count, &dispose_count)).unwrap();
        manager.dispose();
        manager.dispose();

        assert_eq!(dispose_count.load(Ordering::SeqCst), 1);
        assert_eq!(manager.len(), 0);

        manager.get_or_create(key, || build(&build_count, &dispose_count)).unwrap();
        assert_eq!(build_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_build_not_cached() {
        let manager = ScopeManager::new(None);
        let key = ServiceKey::of::<Session>();

        let result: Result<Instance, &str> = manager.get_or_create(key, || Err("failed"));

        assert!(result.is_err());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    #[traced_test]
    fn test_nested_build_of_other_key() {
        struct Pool;

        let manager = ScopeManager::new(None);
        let session: Result<Instance, ()> = manager.get_or_create(ServiceKey::of::<Session>(), || {
            manager.get_or_create(ServiceKey::of::<Pool>(), || Ok::<_, ()>(Built::new(Instance::new(Arc::new(Pool)))))?;
            Ok(Built::new(Instance::new(Arc::new(Session))))
        });

        assert!(session.is_ok());
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_scope_ids() {
        let parent = ScopeManager::new(None);
        let child = ScopeManager::new(Some(parent.id()));

        assert_ne!(parent.id(), child.id());
        assert_eq!(child.parent(), Some(parent.id()));
    }
}
