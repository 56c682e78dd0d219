use alloc::{collections::BTreeMap, sync::Arc};
use tracing::debug;

use crate::{
    any::{Instance, ServiceKey},
    cache::InstanceCell,
    finalizer::BoxedFinalizer,
    instantiator::Activator,
    lifetime::Lifetime,
};

pub(crate) struct Registration {
    pub(crate) service: ServiceKey,
    pub(crate) implementation: ServiceKey,
    pub(crate) activator: Activator,
    pub(crate) lifetime: Lifetime,
    pub(crate) singleton: InstanceCell,
}

impl Registration {
    #[inline]
    #[must_use]
    pub(crate) const fn new(service: ServiceKey, implementation: ServiceKey, activator: Activator, lifetime: Lifetime) -> Self {
        Self {
            service,
            implementation,
            activator,
            lifetime,
            singleton: InstanceCell::new(),
        }
    }

    /// Singleton registration of an already built instance
    #[inline]
    #[must_use]
    pub(crate) fn instance(service: ServiceKey, instance: Instance) -> Self {
        Self {
            service,
            implementation: instance.key(),
            activator: Activator::Instance(instance.clone()),
            lifetime: Lifetime::Singleton,
            singleton: InstanceCell::filled(instance),
        }
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    registrations: BTreeMap<ServiceKey, Arc<Registration>>,
    finalizers: BTreeMap<ServiceKey, BoxedFinalizer>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            registrations: BTreeMap::new(),
            finalizers: BTreeMap::new(),
        }
    }

    /// Adds the registration, the previous one of the same service is replaced
    pub(crate) fn insert(&mut self, registration: Registration) -> Option<Arc<Registration>> {
        let service = registration.service;
        debug!(
            service = service.name,
            implementation = registration.implementation.name,
            lifetime = registration.lifetime.name(),
            activator = registration.activator.name(),
            "Registered"
        );

        let previous = self.registrations.insert(service, Arc::new(registration));
        if previous.is_some() {
            debug!(service = service.name, "Previous registration overwritten");
        }
        previous
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
        self.registrations.get(key).cloned()
    }

    #[inline]
    #[must_use]
    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        self.registrations.contains_key(key)
    }

    #[inline]
    #[must_use]
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    #[inline]
    pub(crate) fn add_finalizer(&mut self, key: ServiceKey, finalizer: BoxedFinalizer) -> Option<BoxedFinalizer> {
        self.finalizers.insert(key, finalizer)
    }

    #[inline]
    #[must_use]
    pub(crate) fn finalizer(&self, key: &ServiceKey) -> Option<BoxedFinalizer> {
        self.finalizers.get(key).cloned()
    }
}
