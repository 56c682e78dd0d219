use alloc::{collections::BTreeMap, collections::VecDeque, sync::Arc, vec::Vec};
use core::mem;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    any::{Instance, ServiceKey},
    finalizer::Disposer,
};

/// Lazily filled instance slot.
///
/// Readers take the shared lock only, the construction lock serializes builders of the same slot.
pub(crate) struct InstanceCell {
    value: RwLock<Option<Instance>>,
    construction: Mutex<()>,
}

impl InstanceCell {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            value: RwLock::new(None),
            construction: Mutex::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) const fn filled(instance: Instance) -> Self {
        Self {
            value: RwLock::new(Some(instance)),
            construction: Mutex::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self) -> Option<Instance> {
        self.value.read().clone()
    }

    /// Returns the stored instance or builds it with `init`.
    /// Only one caller builds, the others wait and get its result.
    /// A failed build leaves the cell empty.
    pub(crate) fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<Instance, E>) -> Result<Instance, E> {
        if let Some(instance) = self.get() {
            debug!("Found in instance cell");
            return Ok(instance);
        }

        let _construction = self.construction.lock();
        if let Some(instance) = self.get() {
            debug!("Built by a concurrent caller");
            return Ok(instance);
        }
        debug!("Not found in instance cell");

        let instance = init()?;
        *self.value.write() = Some(instance.clone());
        Ok(instance)
    }
}

/// Instance cells of one scope together with the pending disposal hooks of the built instances
#[derive(Default)]
pub(crate) struct Cache {
    cells: BTreeMap<ServiceKey, Arc<InstanceCell>>,
    resolved: ResolvedSet,
}

impl Cache {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
            resolved: ResolvedSet::new(),
        }
    }

    /// Returns the cell of `key`, adding an empty one if there's none
    #[must_use]
    pub(crate) fn cell(&mut self, key: ServiceKey) -> Arc<InstanceCell> {
        self.cells.entry(key).or_insert_with(|| Arc::new(InstanceCell::new())).clone()
    }

    /// Number of built instances
    #[inline]
    #[must_use]
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cells.values().filter(|cell| cell.get().is_some()).count()
    }

    #[inline]
    pub(crate) fn push_resolved(&mut self, resolved: Resolved) {
        self.resolved.push(resolved);
    }

    /// Empties the cache, returning the cells and the hooks that still have to be called
    #[must_use]
    pub(crate) fn take(&mut self) -> (BTreeMap<ServiceKey, Arc<InstanceCell>>, ResolvedSet) {
        (mem::take(&mut self.cells), mem::take(&mut self.resolved))
    }
}

pub(crate) struct Resolved {
    pub(crate) key: ServiceKey,
    pub(crate) disposers: Vec<Disposer>,
}

#[derive(Default)]
pub(crate) struct ResolvedSet(pub(crate) VecDeque<Resolved>);

impl ResolvedSet {
    pub(crate) const fn new() -> Self {
        Self(VecDeque::new())
    }

    /// Skips instances without hooks
    pub(crate) fn push(&mut self, resolved: Resolved) {
        if !resolved.disposers.is_empty() {
            self.0.push_back(resolved);
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Calls the hooks of every instance, the last resolved first.
    /// A failed hook is logged and doesn't stop the others.
    pub(crate) fn dispose(mut self) {
        while let Some(Resolved { key, disposers }) = self.0.pop_back() {
            for disposer in disposers {
                match disposer() {
                    Ok(()) => debug!(service = key.name, "Disposed"),
                    Err(err) => warn!(service = key.name, "Disposal failed: {err}"),
                }
            }
        }
    }
}
