use alloc::{boxed::Box, sync::Arc};

use crate::any::{Instance, ServiceKey};

/// Registration-level disposal hook, see [`crate::Container::add_finalizer`]
pub trait Finalizer<S: ?Sized>: Send + Sync + 'static {
    fn finalize(&self, dependency: Arc<S>) -> anyhow::Result<()>;
}

impl<F, S> Finalizer<S> for F
where
    F: Fn(Arc<S>) -> anyhow::Result<()> + Send + Sync + 'static,
    S: ?Sized,
{
    #[inline]
    fn finalize(&self, dependency: Arc<S>) -> anyhow::Result<()> {
        self(dependency)
    }
}

pub(crate) type BoxedFinalizer = Arc<dyn Fn(&Instance) -> anyhow::Result<()> + Send + Sync>;

/// Disposal hook bound to one built instance
pub(crate) type Disposer = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

#[must_use]
pub(crate) fn boxed_finalizer<S, Fin>(finalizer: Fin) -> BoxedFinalizer
where
    S: ?Sized + Send + Sync + 'static,
    Fin: Finalizer<S>,
{
    Arc::new(move |instance: &Instance| match instance.downcast::<S>() {
        Some(dependency) => finalizer.finalize(dependency),
        None => Err(anyhow::anyhow!(
            "finalizer for {} got an instance of {}",
            ServiceKey::of::<S>(),
            instance.key()
        )),
    })
}

#[inline]
#[must_use]
pub(crate) fn bind_finalizer(finalizer: BoxedFinalizer, instance: Instance) -> Disposer {
    Box::new(move || finalizer(&instance))
}
