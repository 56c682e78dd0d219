use alloc::{collections::BTreeMap, sync::Arc};

use crate::{
    any::{Instance, ServiceKey},
    errors::InstantiateErrorKind,
};

/// Constructor parameter description: name, declared service key and optional default
#[derive(Clone)]
pub struct Parameter {
    pub(crate) name: &'static str,
    pub(crate) key: Option<ServiceKey>,
    pub(crate) default: Option<Instance>,
}

impl Parameter {
    /// Parameter resolved from the container, resolution fails if the service isn't registered
    #[inline]
    #[must_use]
    pub fn new<S>(name: &'static str) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        Self {
            name,
            key: Some(ServiceKey::of::<S>()),
            default: None,
        }
    }

    /// Parameter resolved from the container, `value` is used if the service isn't registered
    #[inline]
    #[must_use]
    pub fn with_default<S>(name: &'static str, value: S) -> Self
    where
        S: Send + Sync + 'static,
    {
        Self::with_default_rc(name, Arc::new(value))
    }

    #[inline]
    #[must_use]
    pub fn with_default_rc<S>(name: &'static str, value: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        Self {
            name,
            key: Some(ServiceKey::of::<S>()),
            default: Some(Instance::new(value)),
        }
    }

    /// Parameter without a service key.
    /// It's never injected, the constructor provides its value.
    #[inline]
    #[must_use]
    pub const fn untyped(name: &'static str) -> Self {
        Self {
            name,
            key: None,
            default: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub const fn key(&self) -> Option<ServiceKey> {
        self.key
    }

    #[inline]
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Resolved constructor arguments by parameter name
#[derive(Default, Clone)]
pub struct Arguments {
    values: BTreeMap<&'static str, Instance>,
}

impl Arguments {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { values: BTreeMap::new() }
    }

    #[inline]
    pub(crate) fn insert(&mut self, name: &'static str, value: Instance) {
        self.values.insert(name, value);
    }

    /// Gets the value of a parameter
    ///
    /// # Errors
    /// - Returns [`InstantiateErrorKind::MissingArgument`] if the parameter wasn't resolved
    /// - Returns [`InstantiateErrorKind::IncorrectArgumentType`] if the value has another type
    pub fn get<S>(&self, name: &'static str) -> Result<Arc<S>, InstantiateErrorKind>
    where
        S: ?Sized + 'static,
    {
        let Some(value) = self.values.get(name) else {
            return Err(InstantiateErrorKind::MissingArgument { name });
        };
        value.downcast().ok_or(InstantiateErrorKind::IncorrectArgumentType {
            name,
            expected: ServiceKey::of::<S>(),
            actual: value.key(),
        })
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
