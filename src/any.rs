use alloc::sync::Arc;
use core::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};

/// Identity of a service contract.
///
/// Keys are compared by [`TypeId`] only, the name is kept for diagnostics and for
/// the module-path heuristics used by implementation discovery.
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl PartialOrd for ServiceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for ServiceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl ServiceKey {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// Full path of the type without `dyn`, generic arguments and additional bounds.
    ///
    /// `dyn app::logging::Logger + Send` becomes `app::logging::Logger`.
    #[must_use]
    pub fn path(&self) -> &'static str {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        name.split(|c| c == '<' || c == ' ').next().unwrap_or(name)
    }

    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let path = self.path();
        path.rsplit_once("::").map_or(path, |(_, name)| name)
    }

    /// Path of the module declaring the type, empty for types at a crate root without a path
    #[inline]
    #[must_use]
    pub fn module_path(&self) -> &'static str {
        self.path().rsplit_once("::").map_or("", |(module, _)| module)
    }

    /// First segment of the module path
    #[inline]
    #[must_use]
    pub fn package(&self) -> &'static str {
        let module = self.module_path();
        module.split("::").next().unwrap_or(module)
    }

    #[inline]
    #[must_use]
    pub fn module_depth(&self) -> usize {
        let module = self.module_path();
        if module.is_empty() {
            0
        } else {
            module.split("::").count()
        }
    }
}

/// Type-erased resolved service.
///
/// Holds an `Arc<S>` behind `dyn Any`, so unsized services (`dyn Trait`) are stored the same way as sized ones.
#[derive(Clone)]
pub(crate) struct Instance {
    key: ServiceKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    #[inline]
    #[must_use]
    pub(crate) fn new<S>(value: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        Self {
            key: ServiceKey::of::<S>(),
            value: Arc::new(value),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) const fn key(&self) -> ServiceKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub(crate) fn downcast<S>(&self) -> Option<Arc<S>>
    where
        S: ?Sized + 'static,
    {
        self.value.downcast_ref::<Arc<S>>().cloned()
    }
}
